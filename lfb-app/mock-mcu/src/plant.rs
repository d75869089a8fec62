//! Simulated robot for the mock MCU.
//!
//! A unicycle model of the bot next to a straight line. Motor pins and the
//! calibration indicator are fake `embedded-hal` outputs that write into the
//! shared `Plant`; the reflectance source reads the sensor array back out of
//! it. While the indicator is high the line is swept back and forth under the
//! array, standing in for the person moving the bot during calibration.

use core::{cell::RefCell, convert::Infallible};

use embedded_hal::{
    digital::{ErrorType as PinErrorType, OutputPin},
    pwm::{ErrorType as PwmErrorType, SetDutyCycle},
};
use lfb_core::utils::{
    config::PWM_FULL_SCALE,
    controllers::{ReflectanceSource, SENSOR_COUNT},
};

pub const SENSORS: usize = SENSOR_COUNT;

/// Distance between neighbouring sensors (mm).
const SENSOR_PITCH_MM: f32 = 10.0;
/// Sensor array ahead of the wheel axle (mm).
const ARRAY_OFFSET_MM: f32 = 40.0;
/// Distance between the wheels (mm).
const WHEEL_BASE_MM: f32 = 100.0;
/// Ground speed at full duty (mm/s).
const TOP_SPEED_MM_S: f32 = 300.0;
/// Width of the line (mm).
const LINE_WIDTH_MM: f32 = 15.0;
/// Raw reading over white and over the line.
const RAW_WHITE: f32 = 180.0;
const RAW_BLACK: f32 = 1900.0;
/// Amplitude and period of the calibration sweep.
const SWEEP_MM: f32 = 40.0;
const SWEEP_PERIOD_S: f32 = 2.0;

/// Pins the bot drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    LeftIn1,
    LeftIn2,
    RightIn1,
    RightIn2,
    Indicator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Default, Clone, Copy)]
struct Bridge {
    in1: bool,
    in2: bool,
    duty: u16,
}

impl Bridge {
    /// Signed wheel command in `[-1, 1]`.
    fn command(&self) -> f32 {
        let magnitude = f32::from(self.duty) / f32::from(PWM_FULL_SCALE);
        match (self.in1, self.in2) {
            (true, false) => magnitude,
            (false, true) => -magnitude,
            _ => 0.0,
        }
    }
}

pub struct Plant {
    /// Lateral distance of the axle center from the line (mm), positive when
    /// the line lies toward the last sensor.
    y: f32,
    /// Heading relative to the line (rad), grows while the right wheel
    /// outruns the left.
    heading: f32,
    start_offset: f32,
    left: Bridge,
    right: Bridge,
    indicator: bool,
    sweep_t: f32,
}

impl Plant {
    pub fn new(start_offset_mm: f32) -> Self {
        Self {
            y: start_offset_mm,
            heading: 0.0,
            start_offset: start_offset_mm,
            left: Bridge::default(),
            right: Bridge::default(),
            indicator: false,
            sweep_t: 0.0,
        }
    }

    fn set_line(
        &mut self,
        line: Line,
        high: bool,
    ) {
        match line {
            Line::LeftIn1 => self.left.in1 = high,
            Line::LeftIn2 => self.left.in2 = high,
            Line::RightIn1 => self.right.in1 = high,
            Line::RightIn2 => self.right.in2 = high,
            Line::Indicator => {
                if self.indicator && !high {
                    // calibration over, put the bot back at its start pose
                    self.y = self.start_offset;
                    self.heading = 0.0;
                }
                self.indicator = high;
            }
        }
    }

    fn set_duty(
        &mut self,
        side: Side,
        duty: u16,
    ) {
        match side {
            Side::Left => self.left.duty = duty,
            Side::Right => self.right.duty = duty,
        }
    }

    /// Advance the model by `dt` seconds.
    pub fn advance(
        &mut self,
        dt: f32,
    ) {
        if self.indicator {
            self.sweep_t += dt;
            let phase = self.sweep_t * core::f32::consts::TAU / SWEEP_PERIOD_S;
            self.y = SWEEP_MM * phase.sin();
            self.heading = 0.0;
            return;
        }

        let vl = self.left.command() * TOP_SPEED_MM_S;
        let vr = self.right.command() * TOP_SPEED_MM_S;
        let v = (vl + vr) / 2.0;
        let omega = (vr - vl) / WHEEL_BASE_MM;

        self.y -= v * self.heading.sin() * dt;
        self.heading += omega * dt;
    }

    /// Where the line crosses the sensor array, in mm from the array center,
    /// positive toward the last sensor. `None` when the array is too far
    /// turned to cross it.
    fn line_on_array(&self) -> Option<f32> {
        let cos = self.heading.cos();
        if cos < 0.2 {
            return None;
        }
        let lateral = self.y - ARRAY_OFFSET_MM * self.heading.sin();
        Some(lateral / cos)
    }

    fn raw_frame(&self) -> [u16; SENSORS] {
        let mut frame = [RAW_WHITE as u16; SENSORS];
        let Some(line) = self.line_on_array() else {
            return frame;
        };
        let center = (SENSORS - 1) as f32 / 2.0;
        for (i, raw) in frame.iter_mut().enumerate() {
            let sensor_mm = (i as f32 - center) * SENSOR_PITCH_MM;
            let d = (sensor_mm - line) / LINE_WIDTH_MM;
            let darkness = (-d * d).exp();
            *raw = (RAW_WHITE + (RAW_BLACK - RAW_WHITE) * darkness) as u16;
        }
        frame
    }
}

/// Fake GPIO output backed by the plant.
pub struct SimPin {
    plant: &'static RefCell<Plant>,
    line: Line,
}

impl SimPin {
    pub fn new(
        plant: &'static RefCell<Plant>,
        line: Line,
    ) -> Self {
        Self { plant, line }
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.plant.borrow_mut().set_line(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.plant.borrow_mut().set_line(self.line, true);
        Ok(())
    }
}

/// Fake PWM output backed by the plant.
pub struct SimPwm {
    plant: &'static RefCell<Plant>,
    side: Side,
}

impl SimPwm {
    pub fn new(
        plant: &'static RefCell<Plant>,
        side: Side,
    ) -> Self {
        Self { plant, side }
    }
}

impl PwmErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        PWM_FULL_SCALE
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        self.plant.borrow_mut().set_duty(self.side, duty);
        Ok(())
    }
}

/// Raw reflectance readings taken from the plant.
pub struct SimSensors {
    plant: &'static RefCell<Plant>,
}

impl SimSensors {
    pub fn new(plant: &'static RefCell<Plant>) -> Self {
        Self { plant }
    }
}

impl ReflectanceSource<SENSORS> for SimSensors {
    type Error = Infallible;

    fn read_raw(&mut self) -> Result<[u16; SENSORS], Self::Error> {
        Ok(self.plant.borrow().raw_frame())
    }
}

#[cfg(test)]
mod tests {
    use lfb_core::utils::{
        controllers::{CalibratedArray, SensorArray},
        step, ControllerState, Tunables,
    };

    use super::*;

    fn leak(plant: Plant) -> &'static RefCell<Plant> {
        Box::leak(Box::new(RefCell::new(plant)))
    }

    #[test]
    fn darkest_sensor_is_under_the_line() {
        let plant = Plant::new(15.0);
        let frame = plant.raw_frame();
        let darkest = (0..SENSORS).max_by_key(|&i| frame[i]).unwrap();
        assert_eq!(darkest, 4);
    }

    #[test]
    fn array_turned_away_sees_only_white() {
        let mut plant = Plant::new(0.0);
        plant.heading = 1.5;
        assert!(plant.raw_frame().iter().all(|&v| v == RAW_WHITE as u16));
    }

    #[test]
    fn bridge_sign_follows_direction_pins() {
        let plant = leak(Plant::new(0.0));
        let mut in1 = SimPin::new(plant, Line::LeftIn1);
        let mut in2 = SimPin::new(plant, Line::LeftIn2);
        let mut pwm = SimPwm::new(plant, Side::Left);

        in1.set_low().unwrap();
        in2.set_high().unwrap();
        pwm.set_duty_cycle(PWM_FULL_SCALE).unwrap();
        assert_eq!(plant.borrow().left.command(), -1.0);

        in1.set_high().unwrap();
        in2.set_low().unwrap();
        assert_eq!(plant.borrow().left.command(), 1.0);
    }

    #[test]
    fn calibrated_sweep_steers_back_toward_line() {
        let plant = leak(Plant::new(12.0));
        let mut indicator = SimPin::new(plant, Line::Indicator);
        let mut array = CalibratedArray::<_, SENSORS>::new(SimSensors::new(plant));

        indicator.set_high().unwrap();
        for _ in 0..400 {
            plant.borrow_mut().advance(0.01);
            array.calibrate().unwrap();
        }
        indicator.set_low().unwrap();

        let reading = array.read().unwrap();
        assert!(reading.position > 2500, "position {}", reading.position);

        let out = step(&reading, ControllerState::default(), &Tunables::default());
        assert!(out.command.right > out.command.left);
    }
}

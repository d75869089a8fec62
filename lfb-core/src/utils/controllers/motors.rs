//! Motor drive for the Line-Follower Bot.
//!
//! The control loop talks to the motors through `MotorDrive`. `Tb6612fng`
//! implements it for a TB6612FNG dual H-bridge wired with two direction
//! inputs and one PWM input per motor.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use crate::utils::config::PWM_FULL_SCALE;

/// Signed speeds for the left and right motors.
///
/// Positive drives a motor forward, negative backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorCommand {
    pub left: i32,
    pub right: i32,
}

impl MotorCommand {
    pub const STOP: MotorCommand = MotorCommand { left: 0, right: 0 };

    pub fn new(
        left: i32,
        right: i32,
    ) -> Self {
        Self { left, right }
    }
}

/// Capability the control loop needs from the motor hardware.
pub trait MotorDrive {
    type Error: core::fmt::Debug;

    /// Apply a speed to each motor. Magnitudes are expected to be clamped
    /// by the caller already.
    fn set_speeds(
        &mut self,
        command: MotorCommand,
    ) -> Result<(), Self::Error>;

    /// Stop both motors.
    fn stop(&mut self) -> Result<(), Self::Error> {
        self.set_speeds(MotorCommand::STOP)
    }
}

/// Errors raised while driving a TB6612FNG.
#[derive(Debug)]
pub enum DriveError<PE: core::fmt::Debug, WE: core::fmt::Debug> {
    /// Setting a direction input failed.
    Direction(PE),
    /// Setting the PWM duty failed.
    Duty(WE),
}

/// One H-bridge channel: two direction inputs and a PWM speed input.
pub struct MotorChannel<IN1, IN2, PWM> {
    in1: IN1,
    in2: IN2,
    pwm: PWM,
}

impl<IN1, IN2, PWM, PE, WE> MotorChannel<IN1, IN2, PWM>
where
    IN1: OutputPin<Error = PE>,
    IN2: OutputPin<Error = PE>,
    PWM: SetDutyCycle<Error = WE>,
    PE: core::fmt::Debug,
    WE: core::fmt::Debug,
{
    pub fn new(
        in1: IN1,
        in2: IN2,
        pwm: PWM,
    ) -> Self {
        Self { in1, in2, pwm }
    }

    /// Set direction from the sign of `speed`, then duty from its magnitude.
    ///
    /// Zero counts as forward. The magnitude saturates at `max_speed` out of
    /// `PWM_FULL_SCALE`.
    pub fn drive(
        &mut self,
        speed: i32,
        max_speed: u16,
    ) -> Result<(), DriveError<PE, WE>> {
        if speed >= 0 {
            self.in1.set_high().map_err(DriveError::Direction)?;
            self.in2.set_low().map_err(DriveError::Direction)?;
        } else {
            self.in1.set_low().map_err(DriveError::Direction)?;
            self.in2.set_high().map_err(DriveError::Direction)?;
        }

        let duty = speed.unsigned_abs().min(u32::from(max_speed)) as u16;
        self.pwm
            .set_duty_cycle_fraction(duty, PWM_FULL_SCALE)
            .map_err(DriveError::Duty)
    }

    pub fn release(self) -> (IN1, IN2, PWM) {
        (self.in1, self.in2, self.pwm)
    }
}

/// TB6612FNG driving the left (channel A) and right (channel B) motors.
pub struct Tb6612fng<A1, A2, PA, B1, B2, PB> {
    left: MotorChannel<A1, A2, PA>,
    right: MotorChannel<B1, B2, PB>,
    max_speed: u16,
}

impl<A1, A2, PA, B1, B2, PB, PE, WE> Tb6612fng<A1, A2, PA, B1, B2, PB>
where
    A1: OutputPin<Error = PE>,
    A2: OutputPin<Error = PE>,
    PA: SetDutyCycle<Error = WE>,
    B1: OutputPin<Error = PE>,
    B2: OutputPin<Error = PE>,
    PB: SetDutyCycle<Error = WE>,
    PE: core::fmt::Debug,
    WE: core::fmt::Debug,
{
    /// Create a driver whose duty never exceeds `max_speed` out of
    /// `PWM_FULL_SCALE`.
    pub fn new(
        left: MotorChannel<A1, A2, PA>,
        right: MotorChannel<B1, B2, PB>,
        max_speed: u16,
    ) -> Self {
        Self {
            left,
            right,
            max_speed: max_speed.min(PWM_FULL_SCALE),
        }
    }

    pub fn release(self) -> (MotorChannel<A1, A2, PA>, MotorChannel<B1, B2, PB>) {
        (self.left, self.right)
    }
}

impl<A1, A2, PA, B1, B2, PB, PE, WE> MotorDrive for Tb6612fng<A1, A2, PA, B1, B2, PB>
where
    A1: OutputPin<Error = PE>,
    A2: OutputPin<Error = PE>,
    PA: SetDutyCycle<Error = WE>,
    B1: OutputPin<Error = PE>,
    B2: OutputPin<Error = PE>,
    PB: SetDutyCycle<Error = WE>,
    PE: core::fmt::Debug,
    WE: core::fmt::Debug,
{
    type Error = DriveError<PE, WE>;

    fn set_speeds(
        &mut self,
        command: MotorCommand,
    ) -> Result<(), Self::Error> {
        self.left.drive(command.left, self.max_speed)?;
        self.right.drive(command.right, self.max_speed)
    }
}

//! Module Exports
//!
//! This file exports the hardware-facing controllers of the line follower and
//! the cycle executor that ties them together.
//!
//! - `sensors`: reflectance array calibration and line position.
//! - `motors`: signed speed commands to a TB6612FNG dual H-bridge.

pub mod motors;
pub mod sensors;

use embassy_time::{Duration, Instant, Ticker, Timer};
use embedded_hal::digital::OutputPin;

pub use motors::{DriveError, MotorChannel, MotorCommand, MotorDrive, Tb6612fng};
pub use sensors::{
    CalibratedArray, ReflectanceSource, SensorArray, SensorReading, MAX_SENSORS, SENSOR_COUNT,
};

use crate::utils::{
    config::{Tunables, TunablesError},
    diagnostics::DiagnosticsSink,
    tracker::{self, ControllerState, Mode},
};

/// Pause between calibration passes so other tasks get to run.
const CALIBRATION_PAUSE: Duration = Duration::from_millis(1);

/// Errors from a single control cycle.
#[derive(Debug)]
pub enum CycleError<SE: core::fmt::Debug, DE: core::fmt::Debug> {
    Sensor(SE),
    Drive(DE),
}

/// Runs the startup sequence and the fixed-period control loop.
///
/// Owns the sensor array, the motor drive, the diagnostics sink and the
/// calibration indicator line, plus the one value carried between cycles.
pub struct LineFollower<S, D, K, L, const N: usize> {
    sensors: S,
    drive: D,
    sink: K,
    indicator: L,
    tunables: Tunables,
    state: ControllerState,
}

impl<S, D, K, L, const N: usize> LineFollower<S, D, K, L, N>
where
    S: SensorArray<N>,
    D: MotorDrive,
    K: DiagnosticsSink<N>,
    L: OutputPin,
{
    /// Create a follower; `None` tunables means the tuned defaults.
    ///
    /// Fails with the first `Tunables::validate` error.
    pub fn new(
        sensors: S,
        drive: D,
        sink: K,
        indicator: L,
        tunables: Option<Tunables>,
    ) -> Result<Self, TunablesError> {
        let tunables = tunables.unwrap_or_default();
        tunables.validate()?;

        if sensors.position_max() != tunables.position_max {
            tracing::warn!(
                array = sensors.position_max(),
                configured = tunables.position_max,
                "position_max does not match the sensor array"
            );
        }

        Ok(LineFollower {
            sensors,
            drive,
            sink,
            indicator,
            tunables,
            state: ControllerState::default(),
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Give back the owned hardware.
    pub fn release(self) -> (S, D, K, L) {
        (self.sensors, self.drive, self.sink, self.indicator)
    }

    /// Bring up the hardware and calibrate the sensors.
    ///
    /// Sensors are initialized, motors put in a stopped state, then after the
    /// warm-up hold the indicator is raised while `calibrate()` runs for the
    /// calibration window. Failures are logged and startup carries on.
    pub async fn start(&mut self) {
        if let Err(e) = self.sensors.init() {
            tracing::error!("Sensor init failed: {:?}", e);
        }
        if let Err(e) = self.drive.stop() {
            tracing::error!("Motor init failed: {:?}", e);
        }

        Timer::after(self.tunables.warmup()).await;

        if self.indicator.set_high().is_err() {
            tracing::warn!("Calibration indicator unavailable");
        }
        tracing::info!(
            window_ms = self.tunables.calibration_ms,
            "Calibrating, sweep the line under the sensors"
        );

        let started = Instant::now();
        let mut passes: u32 = 0;
        let mut failures: u32 = 0;
        while started.elapsed() < self.tunables.calibration_window() {
            match self.sensors.calibrate() {
                Ok(()) => passes += 1,
                Err(e) => {
                    failures += 1;
                    tracing::debug!("Calibration pass failed: {:?}", e);
                }
            }
            Timer::after(CALIBRATION_PAUSE).await;
        }

        if self.indicator.set_low().is_err() {
            tracing::warn!("Calibration indicator unavailable");
        }
        tracing::info!(passes, failures, "Calibration done. Starting line following...");
    }

    /// Run one control cycle: read, decide, command, report.
    ///
    /// A failed read leaves the controller state untouched. A failed motor
    /// write is reported after the state and telemetry are already updated.
    pub fn cycle(&mut self) -> Result<Mode, CycleError<S::Error, D::Error>> {
        let reading = self.sensors.read().map_err(CycleError::Sensor)?;
        let out = tracker::step(&reading, self.state, &self.tunables);
        self.state = out.state;

        let driven = self.drive.set_speeds(out.command).map_err(CycleError::Drive);
        self.sink.report(&out.telemetry);
        driven?;

        Ok(out.telemetry.mode())
    }

    /// Cycle forever at the configured period.
    pub async fn run(&mut self) -> ! {
        let mut ticker = Ticker::every(self.tunables.cycle_period());
        let mut mode = Mode::Tracking;
        loop {
            match self.cycle() {
                Ok(next) => {
                    if next != mode {
                        tracing::info!(from = ?mode, to = ?next, "Mode change");
                        mode = next;
                    }
                }
                Err(e) => tracing::error!("Control cycle failed: {:?}", e),
            }
            ticker.next().await;
        }
    }
}

//! Tunable parameters for the line follower.
//!
//! All values are fixed once the controller is constructed. The defaults are
//! the ones the robot was tuned with; a host can override any subset of them
//! from a serialized document since every field falls back to its default.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Full scale of the motor PWM inputs (8-bit duty).
pub const PWM_FULL_SCALE: u16 = 255;

/// Controller gains, speed limits and timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Proportional gain
    pub kp: f32,
    /// Derivative gain
    pub kd: f32,
    /// Speed of both motors when the line is centered.
    pub base_speed: i32,
    /// Speed magnitude limit on either motor, in PWM counts.
    pub max_speed: i32,
    /// Counter-rotation speed used while the line is lost.
    pub recovery_speed: i32,
    /// A calibrated reading above this value means the sensor sees the line.
    ///
    /// Calibrated readings span 0..=1000 with 1000 = darkest, so 800 keeps
    /// only sensors that are clearly over the line.
    pub sensor_threshold: u16,
    /// Largest position the sensor array reports.
    ///
    /// The array reports `(N - 1) * 1000` at its far edge, 5000 for six
    /// sensors. The center is half of this.
    pub position_max: u16,
    /// Scales the PD correction into a speed differential.
    ///
    /// A full-scale error of 2500 gives a proportional correction of 750,
    /// and 750 / 3 = 250, roughly twice `max_speed`, so the motors saturate
    /// before the line leaves the outermost sensor.
    pub correction_divisor: i32,
    /// Control loop period (ms).
    pub cycle_period_ms: u64,
    /// Hold time between motor setup and calibration (ms).
    pub warmup_ms: u64,
    /// Length of the calibration sweep (ms).
    pub calibration_ms: u64,
}

/// Reasons a set of `Tunables` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunablesError {
    MaxSpeedOutOfRange(i32),
    BaseSpeedAboveMax(i32),
    RecoverySpeedOutOfRange(i32),
    ZeroCorrectionDivisor,
    ZeroCyclePeriod,
    ZeroPositionMax,
}

impl core::fmt::Display for TunablesError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            TunablesError::MaxSpeedOutOfRange(v) => {
                write!(f, "max_speed {} must be within 1..={}", v, PWM_FULL_SCALE)
            }
            TunablesError::BaseSpeedAboveMax(v) => {
                write!(f, "base_speed {} exceeds max_speed", v)
            }
            TunablesError::RecoverySpeedOutOfRange(v) => {
                write!(f, "recovery_speed {} must be within 0..=max_speed", v)
            }
            TunablesError::ZeroCorrectionDivisor => f.write_str("correction_divisor must be non-zero"),
            TunablesError::ZeroCyclePeriod => f.write_str("cycle_period_ms must be non-zero"),
            TunablesError::ZeroPositionMax => f.write_str("position_max must be non-zero"),
        }
    }
}

impl core::error::Error for TunablesError {}

impl Tunables {
    pub const DEFAULT: Tunables = Tunables {
        kp: 0.3,
        kd: 0.5,
        base_speed: 75,
        max_speed: 127,
        recovery_speed: 50,
        sensor_threshold: 800,
        position_max: 5000,
        correction_divisor: 3,
        cycle_period_ms: 50,
        warmup_ms: 500,
        calibration_ms: 10_000,
    };

    /// Position of the line when it sits under the middle of the array.
    pub fn center_position(&self) -> i32 {
        i32::from(self.position_max) / 2
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn calibration_window(&self) -> Duration {
        Duration::from_millis(self.calibration_ms)
    }

    /// Check that the speeds fit the PWM range and nothing divides by zero.
    pub fn validate(&self) -> Result<(), TunablesError> {
        if self.max_speed <= 0 || self.max_speed > i32::from(PWM_FULL_SCALE) {
            return Err(TunablesError::MaxSpeedOutOfRange(self.max_speed));
        }
        if self.base_speed.abs() > self.max_speed {
            return Err(TunablesError::BaseSpeedAboveMax(self.base_speed));
        }
        if self.recovery_speed < 0 || self.recovery_speed > self.max_speed {
            return Err(TunablesError::RecoverySpeedOutOfRange(self.recovery_speed));
        }
        if self.correction_divisor == 0 {
            return Err(TunablesError::ZeroCorrectionDivisor);
        }
        if self.cycle_period_ms == 0 {
            return Err(TunablesError::ZeroCyclePeriod);
        }
        if self.position_max == 0 {
            return Err(TunablesError::ZeroPositionMax);
        }
        Ok(())
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let t = Tunables::default();
        assert_eq!(t.validate(), Ok(()));
        assert_eq!(t.center_position(), 2500);
        assert_eq!(t.cycle_period(), Duration::from_millis(50));
        assert_eq!(t.calibration_window(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_max_speed_beyond_pwm() {
        let t = Tunables {
            max_speed: 300,
            ..Tunables::DEFAULT
        };
        assert_eq!(t.validate(), Err(TunablesError::MaxSpeedOutOfRange(300)));
    }

    #[test]
    fn test_rejects_base_above_max() {
        let t = Tunables {
            base_speed: 130,
            ..Tunables::DEFAULT
        };
        assert_eq!(t.validate(), Err(TunablesError::BaseSpeedAboveMax(130)));
    }

    #[test]
    fn test_rejects_zero_divisor() {
        let t = Tunables {
            correction_divisor: 0,
            ..Tunables::DEFAULT
        };
        assert_eq!(t.validate(), Err(TunablesError::ZeroCorrectionDivisor));
    }

    #[test]
    fn test_rejects_negative_recovery() {
        let t = Tunables {
            recovery_speed: -5,
            ..Tunables::DEFAULT
        };
        assert_eq!(t.validate(), Err(TunablesError::RecoverySpeedOutOfRange(-5)));
    }

    #[test]
    fn test_partial_json_overrides_named_fields_only() {
        let t: Tunables = serde_json::from_str(r#"{ "kp": 0.4, "max_speed": 200 }"#).unwrap();
        assert_eq!(t.kp, 0.4);
        assert_eq!(t.max_speed, 200);
        assert_eq!(t.kd, 0.5);
        assert_eq!(t.base_speed, 75);
        assert_eq!(t.calibration_ms, 10_000);
    }
}

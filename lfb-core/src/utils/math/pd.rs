//! Proportional-derivative steering law for a differential-drive robot.
//!
//! `PdLaw` turns a lateral line error and its one-cycle difference into a
//! steering correction, and `differential_speeds` splits that correction
//! across the left and right motors around a common base speed.
//!
//! # Example
//! ```rust
//! use lfb_core::utils::math::pd::{differential_speeds, PdLaw};
//! let law = PdLaw::new(0.3, 0.5);
//! let correction = law.correction(1000, 1000);
//! assert_eq!(correction, 800);
//! assert_eq!(differential_speeds(75, correction, 3, 127), (-127, 127));
//! ```

/// Gains of a PD controller without an integral term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdLaw {
    /// Weight on the current error
    kp: f32,
    /// Weight on the change in error since the previous cycle
    kd: f32,
}

impl PdLaw {
    pub fn new(
        kp: f32,
        kd: f32,
    ) -> Self {
        Self { kp, kd }
    }

    /// Compute `kp * error + kd * derivative`, truncated toward zero.
    ///
    /// `derivative` is a plain difference over one cycle; it is not divided
    /// by elapsed time, so the gains assume a constant cycle period.
    pub fn correction(
        &self,
        error: i32,
        derivative: i32,
    ) -> i32 {
        (self.kp * error as f32 + self.kd * derivative as f32) as i32
    }
}

/// Map a steering correction onto `(left, right)` motor speeds.
///
/// The correction is scaled down by `divisor` (integer division, truncating
/// toward zero), subtracted from the left side and added to the right side,
/// and each side is clamped to `[-max_speed, max_speed]` independently.
pub fn differential_speeds(
    base_speed: i32,
    correction: i32,
    divisor: i32,
    max_speed: i32,
) -> (i32, i32) {
    let delta = correction / divisor;
    (
        clamp_speed(base_speed - delta, max_speed),
        clamp_speed(base_speed + delta, max_speed),
    )
}

/// Saturate a signed speed to `[-max_speed, max_speed]`, keeping its sign.
pub fn clamp_speed(
    speed: i32,
    max_speed: i32,
) -> i32 {
    speed.clamp(-max_speed, max_speed)
}

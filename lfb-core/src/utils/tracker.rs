//! Line tracker: one control step from a sensor reading to motor speeds.
//!
//! `step` is a pure function of the reading, the carried `ControllerState`
//! and the `Tunables`. Each call is either a tracking step (PD correction
//! around the array center) or a recovery step (spin toward the side the
//! line was last seen on). The mode is decided from the current reading
//! alone, so one reading above threshold ends recovery immediately.

use crate::utils::{
    config::Tunables,
    controllers::{motors::MotorCommand, sensors::SensorReading},
    math::pd::{differential_speeds, PdLaw},
};

/// State carried from one control step to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    /// Error of the most recent step that saw the line.
    pub last_error: i32,
}

/// Direction of an in-place recovery spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spin {
    /// Left motor forward, right motor backward.
    Left,
    /// Left motor backward, right motor forward.
    Right,
}

/// Which branch a control step took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tracking,
    Recovering(Spin),
}

/// Per-step diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telemetry<const N: usize> {
    Tracking {
        values: [u16; N],
        position: u16,
        error: i32,
        derivative: i32,
        correction: i32,
        left: i32,
        right: i32,
    },
    Recovering {
        spin: Spin,
    },
}

impl<const N: usize> Telemetry<N> {
    pub fn mode(&self) -> Mode {
        match self {
            Telemetry::Tracking { .. } => Mode::Tracking,
            Telemetry::Recovering { spin } => Mode::Recovering(*spin),
        }
    }
}

/// Output of one control step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<const N: usize> {
    pub command: MotorCommand,
    pub state: ControllerState,
    pub telemetry: Telemetry<N>,
}

/// True when any sensor reads strictly above `threshold`.
pub fn line_detected(
    values: &[u16],
    threshold: u16,
) -> bool {
    values.iter().any(|&v| v > threshold)
}

/// Run one control step.
///
/// `tunables` must pass `Tunables::validate`.
pub fn step<const N: usize>(
    reading: &SensorReading<N>,
    state: ControllerState,
    tunables: &Tunables,
) -> Step<N> {
    if !line_detected(&reading.values, tunables.sensor_threshold) {
        return recover(state, tunables.recovery_speed);
    }

    let error = i32::from(reading.position) - tunables.center_position();
    let derivative = error - state.last_error;
    let correction = PdLaw::new(tunables.kp, tunables.kd).correction(error, derivative);
    let (left, right) = differential_speeds(
        tunables.base_speed,
        correction,
        tunables.correction_divisor,
        tunables.max_speed,
    );

    Step {
        command: MotorCommand::new(left, right),
        state: ControllerState { last_error: error },
        telemetry: Telemetry::Tracking {
            values: reading.values,
            position: reading.position,
            error,
            derivative,
            correction,
            left,
            right,
        },
    }
}

/// Spin toward the sign of the last tracked error; `state` passes through.
fn recover<const N: usize>(
    state: ControllerState,
    speed: i32,
) -> Step<N> {
    let (spin, command) = if state.last_error < 0 {
        (Spin::Left, MotorCommand::new(speed, -speed))
    } else {
        (Spin::Right, MotorCommand::new(-speed, speed))
    };

    Step {
        command,
        state,
        telemetry: Telemetry::Recovering { spin },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Tunables = Tunables::DEFAULT;

    fn on_line(position: u16) -> SensorReading<6> {
        SensorReading::new([0, 0, 900, 900, 0, 0], position)
    }

    fn off_line() -> SensorReading<6> {
        SensorReading::new([800, 120, 0, 0, 40, 800], 0)
    }

    #[test]
    fn test_centered_drives_straight() {
        let out = step(&on_line(2500), ControllerState::default(), &T);
        assert_eq!(out.command, MotorCommand::new(75, 75));
        assert_eq!(out.state.last_error, 0);
        assert_eq!(out.telemetry.mode(), Mode::Tracking);
    }

    #[test]
    fn test_large_offset_saturates() {
        let out = step(&on_line(3500), ControllerState::default(), &T);
        assert_eq!(out.command, MotorCommand::new(-127, 127));
        assert_eq!(
            out.telemetry,
            Telemetry::Tracking {
                values: [0, 0, 900, 900, 0, 0],
                position: 3500,
                error: 1000,
                derivative: 1000,
                correction: 800,
                left: -127,
                right: 127,
            }
        );
        assert_eq!(out.state.last_error, 1000);
    }

    #[test]
    fn test_derivative_uses_last_error() {
        let state = ControllerState { last_error: 100 };
        let out = step(&on_line(2600), state, &T);
        // error 100, derivative 0, correction 30, delta 10
        assert_eq!(out.command, MotorCommand::new(65, 85));
    }

    #[test]
    fn test_threshold_is_strict() {
        // every sensor exactly at threshold still counts as lost
        let reading = SensorReading::new([800; 6], 2500);
        let state = ControllerState { last_error: 7 };
        let out = step(&reading, state, &T);
        assert_eq!(out.telemetry.mode(), Mode::Recovering(Spin::Right));
        assert_eq!(out.state, state);

        let reading = SensorReading::new([0, 0, 0, 0, 0, 801], 5000);
        assert_eq!(step(&reading, state, &T).telemetry.mode(), Mode::Tracking);
    }

    #[test]
    fn test_recovery_left_keeps_last_error() {
        let state = ControllerState { last_error: -50 };
        let out = step(&off_line(), state, &T);
        assert_eq!(out.command, MotorCommand::new(50, -50));
        assert_eq!(out.state.last_error, -50);
        assert_eq!(out.telemetry, Telemetry::Recovering { spin: Spin::Left });
    }

    #[test]
    fn test_recovery_right_keeps_last_error() {
        let state = ControllerState { last_error: 50 };
        let out = step(&off_line(), state, &T);
        assert_eq!(out.command, MotorCommand::new(-50, 50));
        assert_eq!(out.state.last_error, 50);
    }

    #[test]
    fn test_recovery_with_zero_error_spins_right() {
        let out = step(&off_line(), ControllerState::default(), &T);
        assert_eq!(out.telemetry.mode(), Mode::Recovering(Spin::Right));
    }

    #[test]
    fn test_recovery_repeats_without_escalation() {
        let mut state = ControllerState { last_error: -1200 };
        for _ in 0..100 {
            let out = step(&off_line(), state, &T);
            assert_eq!(out.command, MotorCommand::new(50, -50));
            state = out.state;
        }
        assert_eq!(state.last_error, -1200);
    }

    #[test]
    fn test_reacquire_resumes_tracking_immediately() {
        let state = step(&off_line(), ControllerState { last_error: -300 }, &T).state;
        let out = step(&on_line(2400), state, &T);
        assert_eq!(out.telemetry.mode(), Mode::Tracking);
        assert_eq!(out.state.last_error, -100);
    }

    #[test]
    fn test_mirrored_error_swaps_speeds() {
        for (pos, last) in [(2900, 150), (3100, -40), (4700, 2000), (2510, 0)] {
            let error = pos as i32 - 2500;
            let mirrored = (2500 - error) as u16;
            let a = step(&on_line(pos), ControllerState { last_error: last }, &T);
            let b = step(&on_line(mirrored), ControllerState { last_error: -last }, &T);
            assert_eq!(a.command.left, b.command.right, "pos {}", pos);
            assert_eq!(a.command.right, b.command.left, "pos {}", pos);
        }
    }

    #[test]
    fn test_outputs_never_exceed_max_speed() {
        for pos in (0..=5000).step_by(125) {
            for last in [-2500, -600, 0, 600, 2500] {
                let out = step(&on_line(pos), ControllerState { last_error: last }, &T);
                assert!(out.command.left.abs() <= T.max_speed);
                assert!(out.command.right.abs() <= T.max_speed);
                assert_eq!(out.state.last_error, pos as i32 - 2500);
            }
        }
    }
}

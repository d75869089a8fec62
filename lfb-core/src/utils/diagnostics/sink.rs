//! Diagnostics sinks.
//!
//! Every control cycle hands its `Telemetry` to a `DiagnosticsSink`. The
//! human-readable line for a record comes from its `Display` impl:
//!
//! ```text
//! Sensors: 0 0 912 880 0 0 | Pos: 2480 | Err: -20 | Deriv: 5 | Corr: -3 | L: 76 R: 74
//! Line lost! Recovering LEFT
//! ```

use core::fmt;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};

use crate::utils::{
    controllers::sensors::SENSOR_COUNT,
    tracker::{Spin, Telemetry},
};

/// Depth of the default telemetry channel.
pub const TELEMETRY_DEPTH: usize = 8;

/// Channel used to publish telemetry of the on-board sensor array.
pub static TELEMETRY_CHANNEL: Channel<
    CriticalSectionRawMutex,
    Telemetry<SENSOR_COUNT>,
    TELEMETRY_DEPTH,
> = Channel::new();

/// Receives one telemetry record per control cycle.
pub trait DiagnosticsSink<const N: usize> {
    fn report(
        &mut self,
        telemetry: &Telemetry<N>,
    );
}

impl fmt::Display for Spin {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Spin::Left => f.write_str("LEFT"),
            Spin::Right => f.write_str("RIGHT"),
        }
    }
}

impl<const N: usize> fmt::Display for Telemetry<N> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Telemetry::Tracking {
                values,
                position,
                error,
                derivative,
                correction,
                left,
                right,
            } => {
                f.write_str("Sensors:")?;
                for v in values {
                    write!(f, " {}", v)?;
                }
                write!(
                    f,
                    " | Pos: {} | Err: {} | Deriv: {} | Corr: {} | L: {} R: {}",
                    position, error, derivative, correction, left, right
                )
            }
            Telemetry::Recovering { spin } => write!(f, "Line lost! Recovering {}", spin),
        }
    }
}

/// Emits each record as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl<const N: usize> DiagnosticsSink<N> for TracingSink {
    fn report(
        &mut self,
        telemetry: &Telemetry<N>,
    ) {
        match telemetry {
            Telemetry::Tracking { .. } => tracing::info!("{}", telemetry),
            Telemetry::Recovering { spin } => tracing::warn!(?spin, "{}", telemetry),
        }
    }
}

/// Pushes records into a channel for another task to print.
///
/// Never waits: when the channel is full the record is dropped.
pub struct ChannelSink<'a, const N: usize, const DEPTH: usize> {
    channel: &'a Channel<CriticalSectionRawMutex, Telemetry<N>, DEPTH>,
    dropped: u32,
}

impl<'a, const N: usize, const DEPTH: usize> ChannelSink<'a, N, DEPTH> {
    pub fn new(channel: &'a Channel<CriticalSectionRawMutex, Telemetry<N>, DEPTH>) -> Self {
        Self {
            channel,
            dropped: 0,
        }
    }

    /// Records dropped because the channel was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize, const DEPTH: usize> DiagnosticsSink<N> for ChannelSink<'_, N, DEPTH> {
    fn report(
        &mut self,
        telemetry: &Telemetry<N>,
    ) {
        if self.channel.try_send(*telemetry).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            tracing::trace!(dropped = self.dropped, "telemetry channel full");
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::string::ToString;

    use super::*;

    #[test]
    fn test_tracking_line_format() {
        let t: Telemetry<6> = Telemetry::Tracking {
            values: [0, 0, 912, 880, 0, 0],
            position: 2480,
            error: -20,
            derivative: 5,
            correction: -3,
            left: 76,
            right: 74,
        };
        assert_eq!(
            t.to_string(),
            "Sensors: 0 0 912 880 0 0 | Pos: 2480 | Err: -20 | Deriv: 5 | Corr: -3 | L: 76 R: 74"
        );
    }

    #[test]
    fn test_recovery_line_format() {
        let left: Telemetry<6> = Telemetry::Recovering { spin: Spin::Left };
        let right: Telemetry<6> = Telemetry::Recovering { spin: Spin::Right };
        assert_eq!(left.to_string(), "Line lost! Recovering LEFT");
        assert_eq!(right.to_string(), "Line lost! Recovering RIGHT");
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let channel: Channel<CriticalSectionRawMutex, Telemetry<2>, 2> = Channel::new();
        let mut sink = ChannelSink::new(&channel);
        let record = Telemetry::Recovering { spin: Spin::Left };

        for _ in 0..3 {
            sink.report(&record);
        }

        assert_eq!(sink.dropped(), 1);
        assert_eq!(channel.try_receive(), Ok(record));
        assert_eq!(channel.try_receive(), Ok(record));
        assert!(channel.try_receive().is_err());
    }
}

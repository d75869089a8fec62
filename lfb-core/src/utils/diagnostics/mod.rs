//! Module Exports
//!
//! This file exports the diagnostics output of the control loop.
//!
//! # Modules
//! - `sink`: telemetry sinks and the text format of a cycle record.

pub mod sink;

pub use sink::{ChannelSink, DiagnosticsSink, TracingSink, TELEMETRY_CHANNEL, TELEMETRY_DEPTH};

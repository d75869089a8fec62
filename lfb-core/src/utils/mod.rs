//! Utility re-exports and helper macros for the Line-Follower Bot.
//!
//! This module re-exports the control loop, its hardware controllers, timing
//! and diagnostics:
//!
//! - `config`: tunable gains, speeds and timing
//! - `controllers`: sensor array, motor driver and the cycle executor
//! - `diagnostics`: per-cycle telemetry sinks
//! - `math`: the PD steering law
//! - `tracker`: the tracking/recovery state machine
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod diagnostics;
pub mod math;
pub mod tracker;

pub use config::Tunables;
pub use controllers::LineFollower;
pub use embassy_time::*;
pub use tracker::{step, ControllerState};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}

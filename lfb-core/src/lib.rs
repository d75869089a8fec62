//! Core control loop and drivers for the Line-Follower Bot on no-std embedded platforms.
//!
//! For a runnable simulation, see the `lfb-app/mock-mcu` binary.
#![no_std]

pub mod utils;

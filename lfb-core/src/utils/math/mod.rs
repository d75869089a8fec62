//! Math utilities for the Line-Follower Bot.
//!
//! This module provides the PD steering law and differential speed mapping.

pub mod pd;

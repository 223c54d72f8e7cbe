//! # callcap-engine
//!
//! Drives the call capture state machine: pulls signaling events, routes them
//! through correlation and the capture lifecycle, and owns the shutdown path
//! shared by the run loop and the signal handler.

pub mod engine;
pub mod replay;
pub mod runtime;

pub use runtime::{check_setup, run_live_mode, run_replay_mode, ReplayReport};

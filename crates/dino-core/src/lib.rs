//! Small ambient utilities shared by the router core and its binary.
//!
//! Kept deliberately tiny: this crate exists so `dino-router` and
//! `dino-router-app` do not each reinvent atomics, build-info plumbing, and
//! telemetry bootstrapping.

pub mod arc;
pub mod signal;
pub mod telemetry;
pub mod version;

//! Velocity control engine.
//!
//! - [`pid`] - PID with derivative filter and back-calculation anti-windup
//! - [`velocity`] - Normalized velocity loop and torque-speed linearization

pub mod pid;
pub mod velocity;

pub use pid::{PidGains, PidState, pid_compute};
pub use velocity::{VelocityController, linearize_torque};

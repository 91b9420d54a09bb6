//! Hardware bindings consumed by the motor layer.
//!
//! Platform code implements [`MotorHardware`] and [`DigitalInput`]. The
//! control core never talks to a bus directly; see
//! [`drivers::simulation`](crate::drivers::simulation) for the in-process
//! implementations.

use crate::error::{MotorError, MotorResult};
use crate::motor::Motor;

/// Velocity as reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityReading {
    /// Native velocity in sensor units per second.
    Supported(f64),
    /// No native velocity; odometry derives it from position deltas.
    Unsupported,
}

/// Raw motor I/O.
pub trait MotorHardware: Send + Sync {
    /// Position in sensor units, before any software zero offset.
    fn raw_position(&self) -> f64;

    /// Native velocity, if the controller measures one.
    fn raw_velocity(&self) -> VelocityReading {
        VelocityReading::Unsupported
    }

    /// Apply power in `[-1.0, 1.0]`.
    fn set_raw_power(&self, power: f64);

    /// Zero the hardware position counter. May block until the controller
    /// acknowledges. Returns `false` when the hardware cannot do this, in
    /// which case the caller zeroes in software.
    fn reset_position(&self) -> bool {
        false
    }

    /// Make this motor follow `leader`.
    fn follow(&self, leader: &Motor) -> MotorResult<()> {
        Err(MotorError::Unsupported(format!(
            "following motor {}",
            leader.name()
        )))
    }
}

/// Binary sensor such as a limit switch.
pub trait DigitalInput: Send + Sync {
    /// Sensor name.
    fn name(&self) -> &str;

    /// Current state.
    fn is_active(&self) -> bool;
}

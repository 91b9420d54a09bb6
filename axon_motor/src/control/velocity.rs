//! Closed-loop velocity control with torque-speed linearization.
//!
//! The PID loop runs on normalized velocity (fraction of `max_velocity`)
//! and produces a desired fraction of stall torque. A DC motor's available
//! torque falls linearly with speed, so the torque request is scaled by
//! the torque still available at the current speed before it becomes a
//! power command.

use super::pid::{PidGains, PidState, pid_compute};
use crate::error::{MotorError, MotorResult};
use std::time::Duration;

/// Convert a desired stall-torque fraction into motor power.
///
/// `available = 1 - |velocity| / max_velocity`. With torque available the
/// power is `desired / available`, otherwise full power in the direction
/// of `desired`. The result is clamped to `[-1.0, 1.0]`.
pub fn linearize_torque(desired: f64, velocity: f64, max_velocity: f64) -> f64 {
    let speed = velocity.abs() / max_velocity;
    let available = 1.0 - speed;
    let power = if available > 0.0 {
        desired / available
    } else if desired == 0.0 {
        0.0
    } else {
        desired.signum()
    };
    power.clamp(-1.0, 1.0)
}

/// Velocity controller state for one motor.
#[derive(Debug, Clone)]
pub struct VelocityController {
    max_velocity: f64,
    gains: PidGains,
    pid: PidState,
    setpoint: f64,
    nominal_period: Duration,
    last_step: Option<Duration>,
}

impl VelocityController {
    /// Create a controller.
    ///
    /// # Errors
    ///
    /// `MotorError::InvalidArgument` if `max_velocity` is not a positive
    /// finite number.
    pub fn new(max_velocity: f64, gains: PidGains, nominal_period: Duration) -> MotorResult<Self> {
        if !(max_velocity.is_finite() && max_velocity > 0.0) {
            return Err(MotorError::InvalidArgument(format!(
                "max_velocity must be positive, got {max_velocity}"
            )));
        }
        Ok(Self {
            max_velocity,
            gains,
            pid: PidState::default(),
            setpoint: 0.0,
            nominal_period,
            last_step: None,
        })
    }

    /// Target velocity as a fraction of `max_velocity`, clamped to
    /// `[-1.0, 1.0]`.
    pub fn set_setpoint(&mut self, fraction: f64) {
        self.setpoint = fraction.clamp(-1.0, 1.0);
    }

    /// Current target fraction.
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Velocity at which the feedback reads 1.0.
    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Loop gains.
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Run one control cycle and return the power to apply.
    ///
    /// `velocity` is the measured velocity in sensor units per second and
    /// `now` the cycle time; the first step (and any step with no elapsed
    /// time) uses the nominal control period.
    pub fn step(&mut self, velocity: f64, now: Duration) -> f64 {
        let dt = self
            .last_step
            .map(|last| now.saturating_sub(last))
            .filter(|dt| !dt.is_zero())
            .unwrap_or(self.nominal_period);
        self.last_step = Some(now);

        let feedback = velocity / self.max_velocity;
        let error = self.setpoint - feedback;
        let desired = pid_compute(&mut self.pid, &self.gains, error, dt.as_secs_f64()).clamp(-1.0, 1.0);
        linearize_torque(desired, velocity, self.max_velocity)
    }

    /// Clear the integrator and step history.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.last_step = None;
    }
}

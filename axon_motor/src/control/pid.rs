//! PID controller with backward Euler integration, derivative filter (Tf),
//! and anti-windup via back-calculation (Tt).
//!
//! Zero Ki disables integral; zero Kd disables derivative. Inputs and
//! outputs are normalized: the error is a fraction of maximum velocity and
//! the output a fraction of stall torque.

use serde::{Deserialize, Serialize};

/// Internal state of the PID controller.
///
/// Preserves integral accumulator and filtered derivative across cycles.
/// Reset whenever velocity mode is (re-)entered.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    integral: f64,
    prev_error: f64,
    derivative_filtered: f64,
    /// Previous raw (unsaturated) output, for anti-windup.
    prev_raw_output: f64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Integral accumulator.
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

/// Velocity loop gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (0 = disabled).
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    pub kd: f64,
    /// Derivative filter time constant [s] (0 = unfiltered).
    pub tf: f64,
    /// Anti-windup tracking time constant [s] (0 = disabled).
    pub tt: f64,
    /// Output saturation limit, needed for anti-windup.
    pub out_max: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self::pid(1.0, 0.0, 0.0)
    }
}

impl PidGains {
    /// Plain PID gains with unit saturation and no filtering.
    pub const fn pid(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            tf: 0.0,
            tt: 0.0,
            out_max: 1.0,
        }
    }
}

/// Compute one PID cycle using backward Euler integration.
///
/// # Arguments
/// - `state`: Mutable PID internal state.
/// - `gains`: Loop gains.
/// - `error`: Current error (setpoint − feedback).
/// - `dt`: Cycle period [s].
///
/// # Returns
/// Unsaturated PID output; clamping is done by the caller.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    let p_term = gains.kp * error;

    let i_term = if gains.ki != 0.0 {
        // Back-calculation: feed the saturation excess of the previous
        // cycle back into the integral.
        let anti_windup = if gains.tt > 0.0 && gains.out_max > 0.0 {
            let saturated = state.prev_raw_output.clamp(-gains.out_max, gains.out_max);
            (saturated - state.prev_raw_output) / gains.tt
        } else {
            0.0
        };
        state.integral += (gains.ki * error + anti_windup) * dt;
        state.integral
    } else {
        state.integral = 0.0;
        0.0
    };

    let d_term = if gains.kd != 0.0 {
        let raw_derivative = (error - state.prev_error) / dt;
        if gains.tf > 0.0 {
            let alpha = dt / (gains.tf + dt);
            state.derivative_filtered += alpha * (raw_derivative - state.derivative_filtered);
            gains.kd * state.derivative_filtered
        } else {
            gains.kd * raw_derivative
        }
    } else {
        state.derivative_filtered = 0.0;
        0.0
    };

    state.prev_error = error;

    let raw_output = p_term + i_term + d_term;
    state.prev_raw_output = raw_output;
    raw_output
}

// ─── Tests ──────────────────────────────────────────────────────────

//! In-process motor and limit switch for tests and the demo binary.
//!
//! `SimulatedMotor` is a first-order plant: speed approaches
//! `power * max_speed` with time constant `time_constant`, and position
//! integrates speed. Nothing moves until [`SimulatedMotor::advance`] is
//! called, so simulated time stays under the caller's control.

use crate::hal::{DigitalInput, MotorHardware, VelocityReading};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Default)]
struct PlantState {
    position: f64,
    speed: f64,
    power: f64,
    spurious: Option<f64>,
    hardware_resets: u32,
}

/// Simulated DC motor with an encoder.
#[derive(Debug)]
pub struct SimulatedMotor {
    max_speed: f64,
    time_constant: Duration,
    native_velocity: bool,
    state: Mutex<PlantState>,
}

impl SimulatedMotor {
    /// Motor reaching `max_speed` units/s at full power.
    pub fn new(max_speed: f64, time_constant: Duration) -> Self {
        Self {
            max_speed,
            time_constant,
            native_velocity: false,
            state: Mutex::new(PlantState::default()),
        }
    }

    /// Report speed through [`MotorHardware::raw_velocity`].
    pub fn with_native_velocity(mut self) -> Self {
        self.native_velocity = true;
        self
    }

    /// Integrate the plant over `dt`.
    pub fn advance(&self, dt: Duration) {
        let dt_s = dt.as_secs_f64();
        if dt_s <= 0.0 {
            return;
        }
        let mut s = self.state.lock();
        let target = s.power * self.max_speed;
        let tau = self.time_constant.as_secs_f64();
        let blend = if tau > 0.0 { (dt_s / tau).min(1.0) } else { 1.0 };
        s.speed += (target - s.speed) * blend;
        s.position += s.speed * dt_s;
        trace!(
            "sim motor: power={:.3} speed={:.3} position={:.3}",
            s.power, s.speed, s.position
        );
    }

    /// Make the next position read return `value` once.
    pub fn inject_spurious(&self, value: f64) {
        self.state.lock().spurious = Some(value);
    }

    /// Place the encoder at `position`.
    pub fn set_position(&self, position: f64) {
        self.state.lock().position = position;
    }

    /// True encoder position.
    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    /// True speed.
    pub fn speed(&self) -> f64 {
        self.state.lock().speed
    }

    /// Last applied power.
    pub fn power(&self) -> f64 {
        self.state.lock().power
    }

    /// Number of hardware position resets performed.
    pub fn hardware_resets(&self) -> u32 {
        self.state.lock().hardware_resets
    }
}

impl MotorHardware for SimulatedMotor {
    fn raw_position(&self) -> f64 {
        let mut s = self.state.lock();
        s.spurious.take().unwrap_or(s.position)
    }

    fn raw_velocity(&self) -> VelocityReading {
        if self.native_velocity {
            VelocityReading::Supported(self.state.lock().speed)
        } else {
            VelocityReading::Unsupported
        }
    }

    fn set_raw_power(&self, power: f64) {
        self.state.lock().power = power.clamp(-1.0, 1.0);
    }

    fn reset_position(&self) -> bool {
        let mut s = self.state.lock();
        s.position = 0.0;
        s.hardware_resets += 1;
        true
    }
}

/// Simulated limit switch.
///
/// Active when forced on, or when bound to a motor whose true position is
/// at or below the trip point.
#[derive(Debug)]
pub struct SimulatedSwitch {
    name: String,
    forced: AtomicBool,
    lower_limit: Option<(Arc<SimulatedMotor>, f64)>,
}

impl SimulatedSwitch {
    /// Switch operated only through [`set_active`](Self::set_active).
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            forced: AtomicBool::new(false),
            lower_limit: None,
        }
    }

    /// Switch tripped when `motor` reaches `trip_at` or below.
    pub fn lower_limit(name: &str, motor: Arc<SimulatedMotor>, trip_at: f64) -> Self {
        Self {
            lower_limit: Some((motor, trip_at)),
            ..Self::new(name)
        }
    }

    /// Force the switch state.
    pub fn set_active(&self, active: bool) {
        self.forced.store(active, Ordering::SeqCst);
    }
}

impl DigitalInput for SimulatedSwitch {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.forced.load(Ordering::SeqCst)
            || self
                .lower_limit
                .as_ref()
                .is_some_and(|(motor, trip_at)| motor.position() <= *trip_at)
    }
}

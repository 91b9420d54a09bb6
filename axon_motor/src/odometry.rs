//! Motor odometry: periodic position/velocity sampling.
//!
//! Every odometry-enabled motor owns an [`OdometrySensor`] that is a member
//! of the shared [`OdometryRing`]. While the ring has members it runs an
//! input-phase task that samples all of them once per cycle.
//!
//! # Spurious readings
//!
//! Some encoders occasionally report garbage (a bit flip in the high word).
//! A reading is discarded when it is both far from the previous position
//! (more than [`SPURIOUS_MIN_DELTA`] units) and at least 2^27 times larger
//! in magnitude. Either condition alone is a legitimate fast move.

use crate::elapsed::ElapsedTimer;
use crate::error::{MotorError, MotorResult};
use crate::hal::{MotorHardware, VelocityReading};
use axon_common::clock::Clock;
use axon_common::config::OdometryConfig;
use axon_common::consts::{SPURIOUS_MIN_DELTA, SPURIOUS_MIN_EXPONENT};
use axon_common::scheduler::{TaskScheduler, TaskType};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scheduler task name of the sampling sweep.
pub const SAMPLE_TASK_NAME: &str = "axon.odometry.sample";

/// Scheduler task name of the shutdown cleanup.
pub const CLEANUP_TASK_NAME: &str = "axon.odometry.cleanup";

/// Name of the encoder read latency timer.
pub const POSITION_TIMER_NAME: &str = "odometry.raw_position";

/// Snapshot of one motor's odometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorOdometry {
    /// Time of the previous sample.
    pub prev_timestamp: Duration,
    /// Position at the previous sample.
    pub prev_position: f64,
    /// Time of the latest sample.
    pub curr_timestamp: Duration,
    /// Position at the latest sample.
    pub curr_position: f64,
    /// Velocity in sensor units per second.
    pub velocity: f64,
}

/// Whether `reading` is an implausible jump from `previous`.
pub fn is_spurious(previous: f64, reading: f64) -> bool {
    let (a, b) = (previous.abs(), reading.abs());
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    hi - lo > SPURIOUS_MIN_DELTA && (hi / lo.max(1.0)).log2().floor() >= SPURIOUS_MIN_EXPONENT
}

#[derive(Debug, Default)]
struct SensorState {
    odometry: MotorOdometry,
    zero_offset: f64,
    enabled: bool,
    /// Bumped by every reseed; a sample taken across a reseed is dropped.
    seeds: u64,
}

/// Odometry state of one motor.
pub struct OdometrySensor {
    name: String,
    hardware: Arc<dyn MotorHardware>,
    clock: Arc<dyn Clock>,
    state: Mutex<SensorState>,
}

impl OdometrySensor {
    /// Create a disabled sensor reading `hardware`.
    pub fn new(name: &str, hardware: Arc<dyn MotorHardware>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            hardware,
            clock,
            state: Mutex::new(SensorState::default()),
        })
    }

    /// Motor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the sensor is sampled.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Copy of the odometry record, regardless of the enabled flag.
    pub fn snapshot(&self) -> MotorOdometry {
        self.state.lock().odometry
    }

    /// Position relative to the software zero, read straight from hardware.
    pub fn position_now(&self) -> f64 {
        let raw = self.hardware.raw_position();
        raw - self.state.lock().zero_offset
    }

    /// Make the current position read zero and reseed the odometry.
    ///
    /// With `hardware` the controller's counter is reset (blocking); if the
    /// hardware cannot do that, or `hardware` is false, a software offset
    /// is recorded instead.
    pub fn reset_position(&self, hardware: bool) {
        let zeroed_in_hardware = hardware && self.hardware.reset_position();
        let raw = self.hardware.raw_position();
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.zero_offset = if zeroed_in_hardware { 0.0 } else { raw };
        Self::seed(&mut state, raw, now);
        debug!(
            "Odometry position reset (motor={}, hardware={zeroed_in_hardware})",
            self.name
        );
    }

    /// Reseed prev = curr = current position with zero velocity, optionally
    /// resetting the hardware counter first.
    pub fn reseed(&self, hardware_reset: bool) {
        let zeroed_in_hardware = hardware_reset && self.hardware.reset_position();
        let raw = self.hardware.raw_position();
        let now = self.clock.now();
        let mut state = self.state.lock();
        if zeroed_in_hardware {
            state.zero_offset = 0.0;
        }
        Self::seed(&mut state, raw, now);
    }

    fn seed(state: &mut SensorState, raw: f64, now: Duration) {
        state.seeds = state.seeds.wrapping_add(1);
        let position = raw - state.zero_offset;
        state.odometry = MotorOdometry {
            prev_timestamp: now,
            prev_position: position,
            curr_timestamp: now,
            curr_position: position,
            velocity: 0.0,
        };
    }

    fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.reseed(false);
        }
        self.state.lock().enabled = enabled;
    }

    /// Take one sample. Hardware is read without the sensor lock held, so a
    /// reset landing between the read and the update wins over the sample.
    fn sample(&self, position_timer: &ElapsedTimer) {
        let seeded = self.state.lock().seeds;
        let raw = position_timer.measure(self.clock.as_ref(), || self.hardware.raw_position());
        let native_velocity = self.hardware.raw_velocity();
        let now = self.clock.now();

        let mut state = self.state.lock();
        if !state.enabled {
            return;
        }
        if state.seeds != seeded {
            debug!("Odometry sample dropped after a concurrent reset (motor={})", self.name);
            return;
        }
        let reading = raw - state.zero_offset;
        let odo = &mut state.odometry;
        odo.prev_timestamp = odo.curr_timestamp;
        odo.prev_position = odo.curr_position;
        odo.curr_timestamp = now;
        if is_spurious(odo.prev_position, reading) {
            warn!(
                target: "axon::odometry",
                motor = %self.name,
                "Discarding spurious position reading {reading} (previous {})",
                odo.prev_position
            );
        } else {
            odo.curr_position = reading;
        }

        odo.velocity = match native_velocity {
            VelocityReading::Supported(v) => v,
            VelocityReading::Unsupported => {
                let elapsed = odo.curr_timestamp.saturating_sub(odo.prev_timestamp);
                if elapsed.is_zero() {
                    0.0
                } else {
                    (odo.curr_position - odo.prev_position) / elapsed.as_secs_f64()
                }
            }
        };
    }
}

impl std::fmt::Debug for OdometrySensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("OdometrySensor")
            .field("name", &self.name)
            .field("enabled", &state.enabled)
            .field("zero_offset", &state.zero_offset)
            .field("odometry", &state.odometry)
            .finish()
    }
}

/// The set of odometry-enabled motors, sampled together.
pub struct OdometryRing {
    scheduler: Arc<dyn TaskScheduler>,
    config: OdometryConfig,
    this: Weak<OdometryRing>,
    members: Mutex<Vec<Arc<OdometrySensor>>>,
    position_timer: ElapsedTimer,
}

impl OdometryRing {
    /// Create an empty ring and register its shutdown cleanup.
    pub fn new(scheduler: Arc<dyn TaskScheduler>, config: OdometryConfig) -> Arc<Self> {
        let ring = Arc::new_cyclic(|this| Self {
            scheduler,
            config,
            this: this.clone(),
            members: Mutex::new(Vec::new()),
            position_timer: ElapsedTimer::new(POSITION_TIMER_NAME),
        });
        let weak = Arc::downgrade(&ring);
        ring.scheduler.register_periodic(
            CLEANUP_TASK_NAME,
            TaskType::Shutdown,
            Duration::ZERO,
            Arc::new(move |_| {
                if let Some(ring) = weak.upgrade() {
                    ring.clear();
                }
            }),
        );
        ring
    }

    /// Add `sensor`, reseeding and enabling it.
    ///
    /// Returns `false` if it was already a member; it is reseeded anyway.
    /// The first member starts the sampling task.
    pub fn register(&self, sensor: &Arc<OdometrySensor>) -> bool {
        let mut members = self.members.lock();
        if members.iter().any(|m| Arc::ptr_eq(m, sensor)) {
            sensor.reseed(false);
            return false;
        }
        sensor.set_enabled(true);
        members.push(Arc::clone(sensor));
        if members.len() == 1 {
            self.activate();
        }
        debug!("Odometry enabled (motor={}, members={})", sensor.name(), members.len());
        true
    }

    /// Remove `sensor` and disable it.
    ///
    /// Returns `false` if it was not a member. Removing the last member
    /// stops the sampling task.
    pub fn unregister(&self, sensor: &Arc<OdometrySensor>) -> bool {
        let mut members = self.members.lock();
        let Some(index) = members.iter().position(|m| Arc::ptr_eq(m, sensor)) else {
            return false;
        };
        members.remove(index);
        sensor.set_enabled(false);
        if members.is_empty() {
            self.deactivate();
        }
        debug!("Odometry disabled (motor={}, members={})", sensor.name(), members.len());
        true
    }

    /// Sample every member once. Membership is snapshotted first, so
    /// sensors added during the sweep are picked up next cycle.
    pub fn sample_all(&self) -> usize {
        let members = self.members.lock().clone();
        for sensor in &members {
            sensor.sample(&self.position_timer);
        }
        members.len()
    }

    /// Reseed `sensor`, optionally resetting its hardware counter first.
    pub fn reset(&self, sensor: &OdometrySensor, hardware_reset: bool) {
        sensor.reseed(hardware_reset);
    }

    /// Copy of `sensor`'s odometry.
    ///
    /// # Errors
    ///
    /// `MotorError::OdometryDisabled` if the sensor is not a member.
    pub fn read(&self, sensor: &OdometrySensor) -> MotorResult<MotorOdometry> {
        let state = sensor.state.lock();
        if state.enabled {
            Ok(state.odometry)
        } else {
            Err(MotorError::OdometryDisabled {
                motor: sensor.name.clone(),
            })
        }
    }

    /// Drop every member and stop sampling.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.members.lock());
        for sensor in &removed {
            sensor.set_enabled(false);
        }
        self.deactivate();
        if !removed.is_empty() {
            info!("Odometry ring cleared ({} motor(s))", removed.len());
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether the ring has no members.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Whether `sensor` is a member.
    pub fn contains(&self, sensor: &Arc<OdometrySensor>) -> bool {
        self.members.lock().iter().any(|m| Arc::ptr_eq(m, sensor))
    }

    /// Latency of encoder reads taken by the sampling sweep.
    pub fn position_timer(&self) -> &ElapsedTimer {
        &self.position_timer
    }

    /// Whether the sampling task is registered.
    pub fn is_sampling(&self) -> bool {
        self.scheduler.is_registered(SAMPLE_TASK_NAME)
    }

    fn activate(&self) {
        let weak = self.this.clone();
        self.scheduler.register_periodic(
            SAMPLE_TASK_NAME,
            TaskType::Input,
            self.config.sample_interval(),
            Arc::new(move |_| {
                if let Some(ring) = weak.upgrade() {
                    ring.sample_all();
                }
            }),
        );
        debug!("Odometry sampling started");
    }

    fn deactivate(&self) {
        if self.scheduler.unregister_periodic(SAMPLE_TASK_NAME) {
            debug!("Odometry sampling stopped");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

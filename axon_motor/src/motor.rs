//! Motor composition: odometry, velocity mode, timed power and zero
//! calibration around one [`MotorHardware`] binding.
//!
//! # Locking
//!
//! All command state (velocity controller, calibration, last power) sits
//! behind one command lock. Power is written to hardware while that lock
//! is held, so a trigger-driven stop and a control step never interleave.
//! Lock order is command → odometry sensor. Timer targets and trigger
//! handlers are always invoked with no motor lock held.

use crate::control::{PidGains, VelocityController};
use crate::elapsed::ElapsedTimer;
use crate::error::{MotorError, MotorResult};
use crate::hal::{DigitalInput, MotorHardware};
use crate::odometry::{MotorOdometry, OdometryRing, OdometrySensor};
use crate::trigger::{DigitalTrigger, TriggerHandler};
use axon_common::clock::Clock;
use axon_common::config::AxonConfig;
use axon_common::scheduler::{TaskScheduler, TaskType};
use axon_timer::{Timer, TimerAuthority, TimerNotify, TimerOutcome};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shared services a motor is wired to.
#[derive(Clone)]
pub struct MotorContext {
    /// Time source for odometry and control.
    pub clock: Arc<dyn Clock>,
    /// Scheduler running control and trigger tasks.
    pub scheduler: Arc<dyn TaskScheduler>,
    /// Authority expiring shutoff timers.
    pub authority: Arc<TimerAuthority>,
    /// Ring sampling motor odometry.
    pub odometry: Arc<OdometryRing>,
    /// Period of the velocity control step.
    pub control_interval: Duration,
    /// Period at which calibration inputs are polled.
    pub trigger_interval: Duration,
    /// Latency of hardware power writes, shared by every motor.
    pub power_timer: Arc<ElapsedTimer>,
}

/// Name of the power write latency timer.
pub const POWER_TIMER_NAME: &str = "motor.set_raw_power";

impl MotorContext {
    /// Build a context with intervals taken from `config`.
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn TaskScheduler>,
        authority: Arc<TimerAuthority>,
        odometry: Arc<OdometryRing>,
        config: &AxonConfig,
    ) -> Self {
        Self {
            clock,
            scheduler,
            authority,
            odometry,
            control_interval: config.velocity.control_interval(),
            trigger_interval: config.odometry.sample_interval(),
            power_timer: Arc::new(ElapsedTimer::new(POWER_TIMER_NAME)),
        }
    }

    /// Start or stop timing hardware position reads and power writes.
    pub fn set_elapsed_timer_enabled(&self, enabled: bool) {
        self.odometry.position_timer().set_enabled(enabled);
        self.power_timer.set_enabled(enabled);
        debug!("Hardware call timing enabled={enabled}");
    }

    /// Log hardware call latency collected since timing was enabled.
    pub fn report_elapsed_time(&self) {
        self.odometry.position_timer().report();
        self.power_timer.report();
    }
}

struct CommandState {
    velocity: Option<VelocityController>,
    calibrating: bool,
    trigger: Option<Arc<DigitalTrigger>>,
    power: f64,
}

/// A motor.
pub struct Motor {
    name: String,
    this: Weak<Motor>,
    hardware: Arc<dyn MotorHardware>,
    sensor: Arc<OdometrySensor>,
    shutoff: Arc<Timer>,
    ctx: MotorContext,
    command: Mutex<CommandState>,
}

impl Motor {
    /// Create a motor in power mode with odometry disabled.
    pub fn new(name: &str, hardware: Arc<dyn MotorHardware>, ctx: MotorContext) -> Arc<Self> {
        let sensor = OdometrySensor::new(name, Arc::clone(&hardware), Arc::clone(&ctx.clock));
        let shutoff = Timer::new(&format!("motorTimer.{name}"), &ctx.authority);
        Arc::new_cyclic(|this| Self {
            name: name.to_string(),
            this: this.clone(),
            hardware,
            sensor,
            shutoff,
            ctx,
            command: Mutex::new(CommandState {
                velocity: None,
                calibrating: false,
                trigger: None,
                power: 0.0,
            }),
        })
    }

    /// Motor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hardware binding.
    pub fn hardware(&self) -> &Arc<dyn MotorHardware> {
        &self.hardware
    }

    /// Odometry sensor of this motor.
    pub fn sensor(&self) -> &Arc<OdometrySensor> {
        &self.sensor
    }

    fn velocity_task_name(&self) -> String {
        format!("axon.motor.{}.velocity", self.name)
    }

    fn trigger_task_name(&self) -> String {
        format!("axon.motor.{}.trigger", self.name)
    }

    // ── Odometry ────────────────────────────────────────────

    /// Add or remove this motor from the odometry ring.
    pub fn set_odometry_enabled(&self, enabled: bool) {
        let changed = if enabled {
            self.ctx.odometry.register(&self.sensor)
        } else {
            self.ctx.odometry.unregister(&self.sensor)
        };
        if changed {
            debug!("Motor {} odometry enabled={enabled}", self.name);
        }
    }

    /// Whether odometry is sampled for this motor.
    pub fn is_odometry_enabled(&self) -> bool {
        self.sensor.is_enabled()
    }

    /// Copy of the latest odometry.
    pub fn odometry(&self) -> MotorResult<MotorOdometry> {
        self.ctx.odometry.read(&self.sensor)
    }

    /// Latest sampled position.
    pub fn position(&self) -> MotorResult<f64> {
        Ok(self.odometry()?.curr_position)
    }

    /// Latest sampled velocity in sensor units per second.
    pub fn velocity(&self) -> MotorResult<f64> {
        Ok(self.odometry()?.velocity)
    }

    /// Reseed odometry, optionally resetting the hardware counter.
    pub fn reset_odometry(&self, hardware: bool) {
        self.ctx.odometry.reset(&self.sensor, hardware);
    }

    /// Make the current position read zero.
    pub fn reset_position(&self, hardware: bool) {
        self.sensor.reset_position(hardware);
    }

    // ── Velocity mode ───────────────────────────────────────

    /// Switch to closed-loop velocity control.
    ///
    /// Subsequent [`set`](Self::set) values are velocity fractions of
    /// `max_velocity`.
    ///
    /// # Errors
    ///
    /// - `MotorError::OdometryDisabled` if odometry is off; the loop needs
    ///   velocity feedback.
    /// - `MotorError::InvalidArgument` if `max_velocity` is not positive.
    pub fn enable_velocity_mode(&self, max_velocity: f64, gains: PidGains) -> MotorResult<()> {
        if !self.is_odometry_enabled() {
            return Err(MotorError::OdometryDisabled {
                motor: self.name.clone(),
            });
        }
        let controller = VelocityController::new(max_velocity, gains, self.ctx.control_interval)?;
        self.command.lock().velocity = Some(controller);

        let weak = self.this.clone();
        self.ctx.scheduler.register_periodic(
            &self.velocity_task_name(),
            TaskType::Output,
            self.ctx.control_interval,
            Arc::new(move |_| {
                if let Some(motor) = weak.upgrade() {
                    motor.control_step();
                }
            }),
        );
        info!(
            "Motor {} velocity mode enabled (max_velocity={max_velocity}, kp={}, ki={}, kd={})",
            self.name, gains.kp, gains.ki, gains.kd
        );
        Ok(())
    }

    /// Return to power mode. Power stays at the last control output.
    pub fn disable_velocity_mode(&self) {
        self.ctx.scheduler.unregister_periodic(&self.velocity_task_name());
        if self.command.lock().velocity.take().is_some() {
            info!("Motor {} velocity mode disabled", self.name);
        }
    }

    /// Whether velocity mode is active.
    pub fn is_velocity_mode(&self) -> bool {
        self.command.lock().velocity.is_some()
    }

    /// Run one velocity control cycle. Returns the power applied, or `None`
    /// outside velocity mode.
    pub fn control_step(&self) -> Option<f64> {
        let now = self.ctx.clock.now();
        let mut command = self.command.lock();
        let controller = command.velocity.as_mut()?;
        let velocity = match self.ctx.odometry.read(&self.sensor) {
            Ok(odometry) => odometry.velocity,
            Err(e) => {
                warn!("Motor {} skipped control step: {e}", self.name);
                return None;
            }
        };
        let power = controller.step(velocity, now);
        self.write_power(&mut command, power);
        Some(power)
    }

    // ── Power ───────────────────────────────────────────────

    /// Set power, or the velocity fraction in velocity mode. Ends any zero
    /// calibration in progress.
    pub fn set(&self, value: f64) {
        let mut command = self.command.lock();
        command.calibrating = false;
        self.route(&mut command, value);
    }

    /// Set `value` for `duration`, then set zero.
    ///
    /// Any pending shutoff is canceled first, and its target receives
    /// [`TimerOutcome::Canceled`]. A new shutoff is armed only when `value`
    /// is non-zero and `duration` is positive; otherwise `target` is never
    /// notified. On expiry the motor is set to zero and the expiry is
    /// forwarded to `target`.
    pub fn timed_set(
        &self,
        value: f64,
        duration: Duration,
        target: Option<Arc<dyn TimerNotify>>,
    ) -> MotorResult<()> {
        self.shutoff.cancel();
        if value != 0.0 && !duration.is_zero() {
            let shutoff = Shutoff {
                motor: self.this.clone(),
                target,
            };
            self.shutoff.arm(duration, Some(Arc::new(shutoff)))?;
            debug!(
                "Motor {} timed set {value} for {}ms",
                self.name,
                duration.as_millis()
            );
        }
        self.set(value);
        Ok(())
    }

    /// Last power written to hardware.
    pub fn power(&self) -> f64 {
        self.command.lock().power
    }

    /// Whether a shutoff timer is pending.
    pub fn has_pending_shutoff(&self) -> bool {
        self.shutoff.is_active()
    }

    fn route(&self, command: &mut CommandState, value: f64) {
        match command.velocity.as_mut() {
            Some(controller) => controller.set_setpoint(value),
            None => self.write_power(command, value),
        }
    }

    fn write_power(&self, command: &mut CommandState, power: f64) {
        let power = power.clamp(-1.0, 1.0);
        self.ctx
            .power_timer
            .measure(self.ctx.clock.as_ref(), || self.hardware.set_raw_power(power));
        command.power = power;
    }

    // ── Calibration ─────────────────────────────────────────

    /// Reset the position whenever `input` changes state.
    ///
    /// An edge during [`zero_calibrate`](Self::zero_calibrate) also stops
    /// the motor. `handler`, if given, is called after the reset with the
    /// new input state. Replaces any previous binding.
    pub fn reset_position_on_digital_input(
        &self,
        input: Arc<dyn DigitalInput>,
        handler: Option<TriggerHandler>,
    ) {
        let weak = self.this.clone();
        let on_edge: TriggerHandler = Arc::new(move |active: bool| {
            if let Some(motor) = weak.upgrade() {
                motor.on_trigger(active, handler.as_ref());
            }
        });
        let trigger = DigitalTrigger::new(
            &self.trigger_task_name(),
            input,
            on_edge,
            Arc::clone(&self.ctx.scheduler),
            self.ctx.trigger_interval,
        );

        let previous = self.command.lock().trigger.replace(Arc::clone(&trigger));
        if let Some(previous) = previous {
            previous.set_enabled(false);
        }
        trigger.set_enabled(true);
        info!(
            "Motor {} resets position on digital input {}",
            self.name,
            trigger.input().name()
        );
    }

    /// Drive toward the lower limit at `|power|` until the bound digital
    /// input changes. Returns `false` without moving if no enabled input is
    /// bound.
    pub fn zero_calibrate(&self, power: f64) -> bool {
        let mut command = self.command.lock();
        let bound = command.trigger.as_ref().is_some_and(|t| t.is_enabled());
        if !bound {
            warn!("Motor {} cannot zero calibrate without a digital input", self.name);
            return false;
        }
        self.route(&mut command, -power.abs());
        command.calibrating = true;
        info!("Motor {} zero calibrating at power {}", self.name, -power.abs());
        true
    }

    /// Whether zero calibration is in progress.
    pub fn is_calibrating(&self) -> bool {
        self.command.lock().calibrating
    }

    fn on_trigger(&self, active: bool, handler: Option<&TriggerHandler>) {
        {
            let mut command = self.command.lock();
            if command.calibrating {
                self.route(&mut command, 0.0);
                command.calibrating = false;
                info!("Motor {} zero calibration complete", self.name);
            }
        }
        self.sensor.reset_position(false);
        info!("Motor {} position reset by digital input (active={active})", self.name);
        if let Some(handler) = handler {
            handler(active);
        }
    }

    // ── Following ───────────────────────────────────────────

    /// Make this motor follow `leader`, if the hardware supports it.
    pub fn follow(&self, leader: &Motor) -> MotorResult<()> {
        self.hardware.follow(leader)
    }
}

impl Drop for Motor {
    fn drop(&mut self) {
        self.ctx.scheduler.unregister_periodic(&self.velocity_task_name());
        if let Some(trigger) = self.command.get_mut().trigger.take() {
            trigger.set_enabled(false);
        }
        self.ctx.odometry.unregister(&self.sensor);
    }
}

impl fmt::Debug for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = self.command.lock();
        f.debug_struct("Motor")
            .field("name", &self.name)
            .field("power", &command.power)
            .field("velocity_mode", &command.velocity.is_some())
            .field("calibrating", &command.calibrating)
            .field("odometry", &self.sensor.is_enabled())
            .finish()
    }
}

/// Shutoff target of one timed set.
struct Shutoff {
    motor: Weak<Motor>,
    target: Option<Arc<dyn TimerNotify>>,
}

impl TimerNotify for Shutoff {
    fn notify(&self, timer: &str, outcome: TimerOutcome) {
        if outcome == TimerOutcome::Expired {
            if let Some(motor) = self.motor.upgrade() {
                motor.set(0.0);
                debug!("Motor {} timed set expired", motor.name);
            }
        }
        if let Some(target) = &self.target {
            target.notify(timer, outcome);
        }
    }

    fn armed(&self) {
        if let Some(target) = &self.target {
            target.armed();
        }
    }
}

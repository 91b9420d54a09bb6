//! Shared rig for the integration workflows.

mod calibration;
mod odometry;
mod timed_set;
mod velocity_mode;

use axon_common::clock::ManualClock;
use axon_common::config::AxonConfig;
use axon_common::scheduler::CooperativeScheduler;
use axon_motor::drivers::SimulatedMotor;
use axon_motor::{Motor, MotorContext, OdometryRing};
use axon_timer::TimerAuthority;
use std::sync::Arc;
use std::time::Duration;

/// One scheduler cycle.
pub const CYCLE: Duration = Duration::from_millis(10);

/// Control core on a manual clock.
pub struct Rig {
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<CooperativeScheduler>,
    pub authority: Arc<TimerAuthority>,
    pub ring: Arc<OdometryRing>,
    pub ctx: MotorContext,
}

impl Rig {
    pub fn new() -> Self {
        let config = AxonConfig::default();
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(CooperativeScheduler::new(clock.clone()));
        let authority = Arc::new(TimerAuthority::new(clock.clone(), config.timer.clone()));
        authority.attach(scheduler.as_ref());
        let ring = OdometryRing::new(scheduler.clone(), config.odometry.clone());
        let ctx = MotorContext::new(
            clock.clone(),
            scheduler.clone(),
            authority.clone(),
            ring.clone(),
            &config,
        );
        Self {
            clock,
            scheduler,
            authority,
            ring,
            ctx,
        }
    }

    /// Simulated plant plus the motor driving it.
    pub fn motor(&self, name: &str, max_speed: f64) -> (Arc<SimulatedMotor>, Arc<Motor>) {
        let plant = Arc::new(SimulatedMotor::new(max_speed, Duration::from_millis(100)));
        let motor = Motor::new(name, plant.clone(), self.ctx.clone());
        (plant, motor)
    }

    /// Run one cycle: advance time, move the plants, run due tasks.
    pub fn cycle(&self, plants: &[&SimulatedMotor]) {
        self.clock.advance(CYCLE);
        for plant in plants {
            plant.advance(CYCLE);
        }
        self.scheduler.run_due();
    }

    /// Run cycles covering `duration`.
    pub fn run_for(&self, duration: Duration, plants: &[&SimulatedMotor]) {
        let cycles = duration.as_millis() / CYCLE.as_millis();
        for _ in 0..cycles {
            self.cycle(plants);
        }
    }
}

//! # AXON Control Core Runner
//!
//! Wires the control core context objects (watchdog registry, timer
//! authority, odometry ring) to a cooperative scheduler driven by a tokio
//! interval, and runs a simulated actuator demo on top of them.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults until Ctrl+C
//! axon
//!
//! # Explicit config, 10 second run, verbose
//! axon --config config/axon.toml --duration 10 -v
//!
//! # Let the monitored worker stall to see a watchdog report
//! axon --stall --duration 5
//!
//! # Report hardware call latency on exit
//! axon --elapsed --duration 5
//! ```

use axon_common::clock::{Clock, MonotonicClock};
use axon_common::config::{AxonConfig, ConfigError, ConfigLoader};
use axon_common::consts::DEFAULT_CONFIG_PATH;
use axon_common::scheduler::CooperativeScheduler;
use axon_motor::drivers::{SimulatedMotor, SimulatedSwitch};
use axon_motor::{Motor, MotorContext, OdometryRing, PidGains};
use axon_timer::{Event, TimerAuthority};
use axon_watchdog::WatchdogRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tokio::signal;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// AXON - real-time actuation control core
#[derive(Parser, Debug)]
#[command(name = "axon")]
#[command(version)]
#[command(about = "Actuation control core with watchdogs, authenticated timers and motor control")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(short, long, value_name = "SECONDS")]
    duration: Option<u64>,

    /// Stop heartbeating from the monitored worker after two seconds
    #[arg(long)]
    stall: bool,

    /// Time hardware position reads and power writes, report at shutdown
    #[arg(long)]
    elapsed: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// Simulated plants advanced by the main loop.
struct Demo {
    lift_plant: Arc<SimulatedMotor>,
    flywheel_plant: Arc<SimulatedMotor>,
    intake_plant: Arc<SimulatedMotor>,
    lift: Arc<Motor>,
    flywheel: Arc<Motor>,
    intake: Arc<Motor>,
    intake_done: Arc<Event>,
}

impl Demo {
    fn start(ctx: &MotorContext) -> Result<Self, Box<dyn std::error::Error>> {
        let lift_plant = Arc::new(SimulatedMotor::new(200.0, Duration::from_millis(80)));
        lift_plant.set_position(300.0);
        let lift = Motor::new("lift", lift_plant.clone(), ctx.clone());
        lift.set_odometry_enabled(true);
        let home = Arc::new(SimulatedSwitch::lower_limit("lift.home", lift_plant.clone(), 0.0));
        lift.reset_position_on_digital_input(
            home,
            Some(Arc::new(|active: bool| info!("Lift home switch active={active}"))),
        );
        lift.zero_calibrate(0.4);

        let flywheel_plant = Arc::new(
            SimulatedMotor::new(3000.0, Duration::from_millis(250)).with_native_velocity(),
        );
        let flywheel = Motor::new("flywheel", flywheel_plant.clone(), ctx.clone());
        flywheel.set_odometry_enabled(true);
        flywheel.enable_velocity_mode(3000.0, PidGains::pid(1.0, 2.0, 0.0))?;
        flywheel.set(0.6);

        let intake_plant = Arc::new(SimulatedMotor::new(100.0, Duration::from_millis(50)));
        let intake = Motor::new("intake", intake_plant.clone(), ctx.clone());
        let intake_done = Arc::new(Event::new("intake.done"));
        intake.timed_set(0.5, Duration::from_secs(2), Some(intake_done.clone()))?;

        Ok(Self {
            lift_plant,
            flywheel_plant,
            intake_plant,
            lift,
            flywheel,
            intake,
            intake_done,
        })
    }

    fn advance(&self, dt: Duration) {
        self.lift_plant.advance(dt);
        self.flywheel_plant.advance(dt);
        self.intake_plant.advance(dt);
    }

    fn report(&self) {
        info!(
            "lift: pos={:.1} calibrating={} | flywheel: vel={:.0} power={:.2} | intake: power={:.2} done={}",
            self.lift.position().unwrap_or(f64::NAN),
            self.lift.is_calibrating(),
            self.flywheel.velocity().unwrap_or(f64::NAN),
            self.flywheel.power(),
            self.intake.power(),
            self.intake_done.is_signaled(),
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, defaulted) = match AxonConfig::load(&args.config) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound) => (AxonConfig::default(), true),
        Err(e) => return Err(e.into()),
    };
    config.validate()?;

    setup_tracing(&args, &config);
    info!("AXON v{} starting ({})", env!("CARGO_PKG_VERSION"), config.shared.service_name);
    if defaulted {
        warn!("No config at {}, using defaults", args.config.display());
    }

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let scheduler = Arc::new(CooperativeScheduler::new(clock.clone()));

    let watchdogs = Arc::new(WatchdogRegistry::new(clock.clone(), config.watchdog.clone()));
    watchdogs.attach(scheduler.as_ref());
    let authority = Arc::new(TimerAuthority::new(clock.clone(), config.timer.clone()));
    authority.attach(scheduler.as_ref());
    let ring = OdometryRing::new(scheduler.clone(), config.odometry.clone());
    let ctx = MotorContext::new(clock.clone(), scheduler.clone(), authority, ring, &config);

    ctx.set_elapsed_timer_enabled(args.elapsed);
    let demo = Demo::start(&ctx)?;

    let running = Arc::new(AtomicBool::new(true));
    let worker = spawn_worker(watchdogs.clone(), running.clone(), args.stall)?;

    let cycle = config.timer.poll_interval();
    let run_loop = async {
        let mut tick = tokio::time::interval(cycle);
        let mut last = clock.now();
        let mut next_report = last;
        while !scheduler.is_shut_down() {
            tick.tick().await;
            let now = clock.now();
            demo.advance(now.saturating_sub(last));
            last = now;
            scheduler.run_due();
            if now >= next_report {
                demo.report();
                next_report = now + Duration::from_secs(1);
            }
        }
    };
    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = run_loop => {}
        _ = deadline => info!("Run duration elapsed"),
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
            Err(e) => error!("Unable to listen for shutdown signal: {e}"),
        },
    }

    running.store(false, Ordering::SeqCst);
    if worker.join().is_err() {
        error!("Worker thread panicked");
    }
    let ran = scheduler.shutdown();
    demo.report();
    ctx.report_elapsed_time();
    info!("AXON shutdown complete ({ran} shutdown task(s), {} watchdog(s) left)", watchdogs.len());
    Ok(())
}

/// Monitored worker: heartbeats every 100 ms, or stops after two seconds
/// when `stall` is set.
fn spawn_worker(
    watchdogs: Arc<WatchdogRegistry>,
    running: Arc<AtomicBool>,
    stall: bool,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("axon-worker".to_string())
        .spawn(move || {
            let Some(watchdog) = watchdogs.register_default("axon-worker") else {
                return;
            };
            let mut beats = 0u32;
            while running.load(Ordering::SeqCst) {
                if !stall || beats < 20 {
                    watchdog.send_heartbeat();
                    beats += 1;
                }
                thread::sleep(Duration::from_millis(100));
            }
            watchdogs.unregister(&watchdog);
        })
}

/// Setup tracing subscriber based on CLI arguments and config.
fn setup_tracing(args: &Args, config: &AxonConfig) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.shared.log_level.into()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .init();
    }
}

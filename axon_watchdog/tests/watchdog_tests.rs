//! # Watchdog Integration Tests
//!
//! Exercises the registry with real worker threads on simulated time:
//!
//! - Stall detection reported exactly once per stall
//! - Owner-only heartbeat and unregister
//! - Pause around long waits
//! - Sweep driven by the cooperative scheduler

use axon_common::clock::ManualClock;
use axon_common::config::WatchdogConfig;
use axon_common::scheduler::CooperativeScheduler;
use axon_watchdog::{Watchdog, WatchdogRegistry};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// ─── Helpers ────────────────────────────────────────────────────────

fn registry(clock: &Arc<ManualClock>) -> Arc<WatchdogRegistry> {
    Arc::new(WatchdogRegistry::new(clock.clone(), WatchdogConfig::default()))
}

/// Spawn a named worker that registers a watchdog and then obeys commands.
fn spawn_worker(
    reg: Arc<WatchdogRegistry>,
    name: &'static str,
    threshold: Duration,
) -> (Arc<Watchdog>, mpsc::Sender<&'static str>, thread::JoinHandle<bool>) {
    let (wd_tx, wd_rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel::<&'static str>();
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let wd = reg.register(name, threshold).expect("register");
            wd_tx.send(wd.clone()).unwrap();
            let mut unregistered = false;
            for cmd in cmd_rx {
                match cmd {
                    "beat" => wd.send_heartbeat(),
                    "unregister" => unregistered = reg.unregister(&wd),
                    _ => break,
                }
            }
            unregistered
        })
        .unwrap();
    let wd = wd_rx.recv().unwrap();
    (wd, cmd_tx, handle)
}

/// Send a command and wait until the worker has processed it.
fn command(tx: &mpsc::Sender<&'static str>, cmd: &'static str, wd: &Watchdog, expect_clear: bool) {
    tx.send(cmd).unwrap();
    if expect_clear {
        for _ in 0..1000 {
            if !wd.is_expired() && !wd.is_paused() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("worker never processed {cmd}");
    }
}

// ─── Stall detection ───────────────────────────────────────────────

#[test]
fn stalled_worker_reported_once_until_next_heartbeat() {
    let clock = Arc::new(ManualClock::new());
    let reg = registry(&clock);
    let (wd, tx, handle) = spawn_worker(reg.clone(), "stall-worker", Duration::from_millis(200));

    clock.advance(Duration::from_millis(300));
    let reports = reg.sweep();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].watchdog, "stall-worker");
    assert_eq!(reports[0].owner.name.as_deref(), Some("stall-worker"));
    assert_eq!(reports[0].owner.id, wd.owner().id);

    clock.advance(Duration::from_secs(5));
    assert!(reg.sweep().is_empty(), "must not re-report the same stall");

    command(&tx, "beat", &wd, true);
    assert!(reg.sweep().is_empty());

    clock.advance(Duration::from_millis(201));
    assert_eq!(reg.sweep().len(), 1, "new stall after heartbeat is reported");

    tx.send("quit").unwrap();
    handle.join().unwrap();
}

#[test]
fn expiry_report_carries_stack() {
    let clock = Arc::new(ManualClock::new());
    let reg = registry(&clock);
    reg.register("stacked", Duration::from_millis(10)).unwrap();
    clock.advance(Duration::from_millis(11));
    let reports = reg.sweep();
    assert_eq!(reports.len(), 1);
    // force_capture always produces a backtrace, even with RUST_BACKTRACE unset.
    assert_eq!(
        reports[0].stack.status(),
        std::backtrace::BacktraceStatus::Captured
    );
}

// ─── Ownership ─────────────────────────────────────────────────────

#[test]
fn heartbeat_from_test_thread_does_not_touch_worker_watchdog() {
    let clock = Arc::new(ManualClock::new());
    let reg = registry(&clock);
    let (wd, tx, handle) = spawn_worker(reg.clone(), "owned-worker", Duration::from_millis(100));

    clock.advance(Duration::from_millis(150));
    reg.sweep();
    let deadline = wd.deadline();

    wd.send_heartbeat(); // not the owner
    assert!(wd.is_expired());
    assert_eq!(wd.deadline(), deadline);

    assert!(!reg.unregister(&wd)); // not the owner
    assert_eq!(reg.len(), 1);

    tx.send("unregister").unwrap();
    tx.send("quit").unwrap();
    assert!(handle.join().unwrap(), "owner unregister succeeds");
    assert!(reg.is_empty());
}

// ─── Pause ─────────────────────────────────────────────────────────

#[test]
fn pause_from_other_thread_suppresses_then_heartbeat_resumes() {
    let clock = Arc::new(ManualClock::new());
    let reg = registry(&clock);
    let (wd, tx, handle) = spawn_worker(reg.clone(), "sleeper", Duration::from_millis(100));

    wd.pause();
    clock.advance(Duration::from_secs(3));
    assert!(reg.sweep().is_empty());

    command(&tx, "beat", &wd, true);
    assert!(!wd.is_paused());
    clock.advance(Duration::from_millis(101));
    assert_eq!(reg.sweep().len(), 1);

    tx.send("quit").unwrap();
    handle.join().unwrap();
}

// ─── Scheduler integration ─────────────────────────────────────────

#[test]
fn scheduled_sweep_detects_stall() {
    let clock = Arc::new(ManualClock::new());
    let config = WatchdogConfig {
        sweep_interval_ms: 100,
        ..WatchdogConfig::default()
    };
    let reg = Arc::new(WatchdogRegistry::new(clock.clone(), config));
    let scheduler = CooperativeScheduler::new(clock.clone());
    reg.attach(&scheduler);

    let wd = reg.register("main-loop", Duration::from_millis(250)).unwrap();
    for _ in 0..10 {
        clock.advance(Duration::from_millis(100));
        wd.send_heartbeat();
        scheduler.run_due();
        assert!(!wd.is_expired());
    }

    clock.advance(Duration::from_millis(300));
    scheduler.run_due();
    assert!(wd.is_expired());
}

#[test]
fn heartbeat_stack_capture_updates_checkpoint() {
    let clock = Arc::new(ManualClock::new());
    let config = WatchdogConfig {
        capture_heartbeat_stack: true,
        ..WatchdogConfig::default()
    };
    let reg = Arc::new(WatchdogRegistry::new(clock.clone(), config));
    let wd = reg.register("checkpointed", Duration::from_millis(10)).unwrap();

    clock.advance(Duration::from_millis(5));
    wd.send_heartbeat();
    clock.advance(Duration::from_millis(20));
    let reports = reg.sweep();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].deadline, Duration::from_millis(15));
}

// ─── Properties ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn one_report_per_stall(threshold_ms in 1u64..5_000, extra_ms in 1u64..5_000, sweeps in 1usize..8) {
        let clock = Arc::new(ManualClock::new());
        let reg = registry(&clock);
        let wd = reg.register("prop", Duration::from_millis(threshold_ms)).unwrap();

        clock.advance(Duration::from_millis(threshold_ms));
        prop_assert!(reg.sweep().is_empty());

        clock.advance(Duration::from_millis(extra_ms));
        let mut total = 0;
        for _ in 0..sweeps {
            total += reg.sweep().len();
            clock.advance(Duration::from_millis(threshold_ms));
        }
        prop_assert_eq!(total, 1);

        wd.send_heartbeat();
        prop_assert!(!wd.is_expired());
    }
}

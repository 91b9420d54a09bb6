//! Timed power: shutoff on expiry, cancellation on re-command.

use super::Rig;
use axon_timer::{Event, EventState};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_timed_set_shuts_off_and_signals_once() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("intake", 100.0);
    let ev = Arc::new(Event::new("intake.done"));

    motor
        .timed_set(0.5, Duration::from_secs(2), Some(ev.clone()))
        .unwrap();
    assert_eq!(motor.power(), 0.5);
    assert_eq!(plant.power(), 0.5);

    rig.run_for(Duration::from_millis(1990), &[&plant]);
    assert_eq!(motor.power(), 0.5);
    assert_eq!(ev.state(), EventState::Cleared);

    rig.run_for(Duration::from_millis(10), &[&plant]);
    assert_eq!(motor.power(), 0.0);
    assert_eq!(plant.power(), 0.0);
    assert!(ev.is_signaled());

    rig.run_for(Duration::from_secs(3), &[&plant]);
    assert_eq!(ev.signal_count(), 1);
    assert!(!motor.has_pending_shutoff());
}

#[test]
fn test_manual_stop_does_not_signal() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("intake", 100.0);
    let ev = Arc::new(Event::new("intake.done"));

    motor
        .timed_set(0.5, Duration::from_secs(2), Some(ev.clone()))
        .unwrap();
    rig.run_for(Duration::from_millis(500), &[&plant]);
    motor.set(0.0);

    assert_eq!(motor.power(), 0.0);
    assert!(!ev.is_signaled());
    assert_eq!(ev.signal_count(), 0);
    assert!(motor.has_pending_shutoff());
}

#[test]
fn test_recommand_cancels_previous_shutoff() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("lift", 100.0);
    let first = Arc::new(Event::new("first"));
    let second = Arc::new(Event::new("second"));

    motor
        .timed_set(0.5, Duration::from_secs(2), Some(first.clone()))
        .unwrap();
    rig.run_for(Duration::from_secs(1), &[&plant]);

    motor
        .timed_set(0.3, Duration::from_secs(2), Some(second.clone()))
        .unwrap();
    assert!(first.is_canceled());
    assert_eq!(first.cancel_count(), 1);
    assert_eq!(motor.power(), 0.3);

    // The first deadline passes without effect.
    rig.run_for(Duration::from_millis(1500), &[&plant]);
    assert_eq!(motor.power(), 0.3);
    assert_eq!(first.signal_count(), 0);

    rig.run_for(Duration::from_millis(500), &[&plant]);
    assert_eq!(motor.power(), 0.0);
    assert!(second.is_signaled());
    assert_eq!(first.signal_count(), 0);
    assert_eq!(second.signal_count(), 1);
}

#[test]
fn test_timed_zero_cancels_without_arming() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("lift", 100.0);
    let ev = Arc::new(Event::new("ev"));

    motor
        .timed_set(-0.4, Duration::from_secs(1), Some(ev.clone()))
        .unwrap();
    motor.timed_set(0.0, Duration::from_secs(1), None).unwrap();

    assert!(ev.is_canceled());
    assert!(!motor.has_pending_shutoff());
    assert_eq!(rig.authority.pending(), 0);
    rig.run_for(Duration::from_secs(2), &[&plant]);
    assert_eq!(ev.signal_count(), 0);
}

#[test]
fn test_timed_set_in_velocity_mode_zeroes_setpoint() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("drive", 100.0);
    motor.set_odometry_enabled(true);
    motor
        .enable_velocity_mode(100.0, axon_motor::PidGains::pid(1.0, 2.0, 0.0))
        .unwrap();

    motor.timed_set(0.5, Duration::from_secs(3), None).unwrap();
    rig.run_for(Duration::from_secs(3), &[&plant]);
    assert!(motor.velocity().unwrap() > 40.0);

    rig.run_for(Duration::from_secs(5), &[&plant]);
    assert!(motor.velocity().unwrap().abs() < 2.0);
}

#[test]
fn test_unbounded_duration_holds_power_until_recommanded() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("winch", 100.0);
    let first = Arc::new(Event::new("first"));
    rig.clock.advance(Duration::from_secs(5));

    motor
        .timed_set(0.5, Duration::from_secs(2), Some(first.clone()))
        .unwrap();
    motor.timed_set(0.5, Duration::MAX, None).unwrap();
    assert_eq!(first.cancel_count(), 1);
    assert_eq!(motor.power(), 0.5);
    assert!(motor.has_pending_shutoff());

    rig.run_for(Duration::from_secs(3), &[&plant]);
    assert_eq!(motor.power(), 0.5);
    assert!(motor.has_pending_shutoff());

    motor.timed_set(0.0, Duration::ZERO, None).unwrap();
    assert!(!motor.has_pending_shutoff());
    assert_eq!(rig.authority.pending(), 0);
}

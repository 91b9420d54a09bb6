//! Odometry sampling through the scheduler.

use super::{CYCLE, Rig};
use axon_motor::{MotorError, SAMPLE_TASK_NAME};
use axon_common::scheduler::TaskScheduler;
use std::time::Duration;

#[test]
fn test_sampling_follows_enabled_motors() {
    let rig = Rig::new();
    let (_a_plant, a) = rig.motor("left", 100.0);
    let (_b_plant, b) = rig.motor("right", 100.0);
    assert!(!rig.scheduler.is_registered(SAMPLE_TASK_NAME));

    a.set_odometry_enabled(true);
    assert!(rig.scheduler.is_registered(SAMPLE_TASK_NAME));
    a.set_odometry_enabled(true);
    b.set_odometry_enabled(true);
    assert_eq!(rig.ring.len(), 2);

    a.set_odometry_enabled(false);
    assert!(rig.scheduler.is_registered(SAMPLE_TASK_NAME));
    b.set_odometry_enabled(false);
    assert!(!rig.scheduler.is_registered(SAMPLE_TASK_NAME));
    assert!(rig.ring.is_empty());
}

#[test]
fn test_small_step_is_accepted() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("left", 100.0);
    plant.set_position(5.0);
    motor.set_odometry_enabled(true);

    plant.set_position(6.0);
    rig.cycle(&[]);

    let odo = motor.odometry().unwrap();
    assert_eq!(odo.prev_position, 5.0);
    assert_eq!(odo.curr_position, 6.0);
    assert!((odo.velocity - 1.0 / CYCLE.as_secs_f64()).abs() < 1e-9);
}

#[test]
fn test_spurious_jump_is_rejected() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("left", 100.0);
    plant.set_position(5.0);
    motor.set_odometry_enabled(true);

    plant.inject_spurious(1e9);
    rig.cycle(&[]);
    assert_eq!(motor.position().unwrap(), 5.0);
    assert_eq!(motor.velocity().unwrap(), 0.0);

    // The next honest reading is taken normally.
    plant.set_position(7.0);
    rig.cycle(&[]);
    assert_eq!(motor.position().unwrap(), 7.0);
}

#[test]
fn test_large_real_move_is_kept() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("left", 100.0);
    plant.set_position(5.0);
    motor.set_odometry_enabled(true);

    plant.set_position(100_005.0);
    rig.cycle(&[]);
    assert_eq!(motor.position().unwrap(), 100_005.0);
}

#[test]
fn test_position_tracks_plant() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("left", 100.0);
    motor.set_odometry_enabled(true);
    motor.set(1.0);
    rig.run_for(Duration::from_secs(2), &[&plant]);

    assert!((motor.position().unwrap() - plant.position()).abs() < 1e-9);
    assert!((motor.velocity().unwrap() - 100.0).abs() < 1.0);
}

#[test]
fn test_reset_position_in_hardware_and_software() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("left", 100.0);
    plant.set_position(300.0);
    motor.set_odometry_enabled(true);

    motor.reset_position(false);
    assert_eq!(motor.position().unwrap(), 0.0);
    assert_eq!(plant.position(), 300.0);

    motor.reset_position(true);
    assert_eq!(plant.hardware_resets(), 1);
    assert_eq!(plant.position(), 0.0);
    assert_eq!(motor.position().unwrap(), 0.0);

    plant.set_position(12.0);
    rig.cycle(&[]);
    assert_eq!(motor.position().unwrap(), 12.0);
}

#[test]
fn test_reset_odometry_reseeds() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("left", 100.0);
    motor.set_odometry_enabled(true);
    motor.set(0.5);
    rig.run_for(Duration::from_millis(500), &[&plant]);
    assert!(motor.velocity().unwrap() > 0.0);

    motor.reset_odometry(false);
    let odo = motor.odometry().unwrap();
    assert_eq!(odo.velocity, 0.0);
    assert_eq!(odo.prev_position, odo.curr_position);
}

#[test]
fn test_disabled_odometry_reads_fail() {
    let rig = Rig::new();
    let (_plant, motor) = rig.motor("left", 100.0);
    assert!(matches!(motor.position(), Err(MotorError::OdometryDisabled { .. })));
    assert!(matches!(motor.velocity(), Err(MotorError::OdometryDisabled { .. })));
}

#[test]
fn test_shutdown_clears_ring_once() {
    let rig = Rig::new();
    let (_plant, motor) = rig.motor("left", 100.0);
    motor.set_odometry_enabled(true);

    assert_eq!(rig.scheduler.shutdown(), 1);
    assert!(!motor.is_odometry_enabled());
    assert!(rig.ring.is_empty());
    assert_eq!(rig.scheduler.shutdown(), 0);
}

//! Zero calibration against a lower limit switch.

use super::Rig;
use axon_common::scheduler::TaskScheduler;
use axon_motor::TriggerHandler;
use axon_motor::drivers::SimulatedSwitch;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn recorder() -> (Arc<Mutex<Vec<bool>>>, TriggerHandler) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Arc::new(move |active: bool| sink.lock().push(active)))
}

#[test]
fn test_zero_calibrate_stops_and_zeroes_at_limit() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("elevator", 200.0);
    plant.set_position(500.0);
    motor.set_odometry_enabled(true);

    let switch = Arc::new(SimulatedSwitch::lower_limit("elevator.home", plant.clone(), 0.0));
    let (seen, handler) = recorder();
    motor.reset_position_on_digital_input(switch, Some(handler));

    assert!(motor.zero_calibrate(0.5));
    assert!(motor.is_calibrating());
    assert_eq!(motor.power(), -0.5);

    let mut cycles = 0;
    while motor.is_calibrating() && cycles < 2000 {
        rig.cycle(&[&plant]);
        cycles += 1;
    }

    assert!(!motor.is_calibrating(), "limit never reached");
    assert_eq!(motor.power(), 0.0);
    assert_eq!(*seen.lock(), vec![true]);
    assert_eq!(motor.position().unwrap(), 0.0);
    assert!(plant.position() <= 0.0);
}

#[test]
fn test_negative_power_still_drives_down() {
    let rig = Rig::new();
    let (_plant, motor) = rig.motor("elevator", 200.0);
    let switch = Arc::new(SimulatedSwitch::new("elevator.home"));
    motor.reset_position_on_digital_input(switch, None);

    assert!(motor.zero_calibrate(-0.25));
    assert_eq!(motor.power(), -0.25);
}

#[test]
fn test_manual_set_ends_calibration() {
    let rig = Rig::new();
    let (_plant, motor) = rig.motor("elevator", 200.0);
    let switch = Arc::new(SimulatedSwitch::new("elevator.home"));
    motor.reset_position_on_digital_input(switch, None);

    assert!(motor.zero_calibrate(0.5));
    motor.set(0.2);
    assert!(!motor.is_calibrating());
    assert_eq!(motor.power(), 0.2);
}

#[test]
fn test_edge_outside_calibration_only_resets_position() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("turret", 100.0);
    plant.set_position(42.0);
    motor.set_odometry_enabled(true);

    let switch = Arc::new(SimulatedSwitch::new("turret.index"));
    let (seen, handler) = recorder();
    motor.reset_position_on_digital_input(switch.clone(), Some(handler));
    motor.set(0.1);

    switch.set_active(true);
    rig.cycle(&[&plant]);
    assert_eq!(motor.position().unwrap(), 0.0);
    assert_eq!(motor.power(), 0.1);

    switch.set_active(false);
    rig.cycle(&[&plant]);
    assert_eq!(*seen.lock(), vec![true, false]);
}

#[test]
fn test_rebinding_replaces_previous_input() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("turret", 100.0);
    let old = Arc::new(SimulatedSwitch::new("old"));
    let new = Arc::new(SimulatedSwitch::new("new"));
    let (seen, handler) = recorder();

    motor.reset_position_on_digital_input(old.clone(), None);
    motor.reset_position_on_digital_input(new.clone(), Some(handler));

    old.set_active(true);
    rig.cycle(&[&plant]);
    assert!(seen.lock().is_empty());

    new.set_active(true);
    rig.cycle(&[&plant]);
    assert_eq!(*seen.lock(), vec![true]);
    assert!(rig.scheduler.is_registered("axon.motor.turret.trigger"));
}

#[test]
fn test_dropped_motor_releases_tasks() {
    let rig = Rig::new();
    let (_plant, motor) = rig.motor("temp", 100.0);
    motor.set_odometry_enabled(true);
    motor.reset_position_on_digital_input(Arc::new(SimulatedSwitch::new("s")), None);
    drop(motor);

    assert!(rig.ring.is_empty());
    assert!(!rig.scheduler.is_registered("axon.motor.temp.trigger"));
    assert!(!rig.ring.is_sampling());
}

//! Closed-loop velocity control on a simulated plant.

use super::Rig;
use axon_common::scheduler::TaskScheduler;
use axon_motor::{MotorError, PidGains};
use std::time::Duration;

const GAINS: PidGains = PidGains::pid(1.0, 2.0, 0.0);

#[test]
fn test_velocity_converges_to_setpoint() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("shooter", 100.0);
    motor.set_odometry_enabled(true);
    motor.enable_velocity_mode(100.0, GAINS).unwrap();
    assert!(rig.scheduler.is_registered("axon.motor.shooter.velocity"));

    motor.set(0.5);
    rig.run_for(Duration::from_secs(6), &[&plant]);
    let v = motor.velocity().unwrap();
    assert!((v - 50.0).abs() < 2.5, "velocity {v}");
    // Holding half speed on a linear torque curve needs about half power.
    assert!(motor.power() > 0.4 && motor.power() < 0.6, "power {}", motor.power());
}

#[test]
fn test_reverse_setpoint() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("shooter", 100.0);
    motor.set_odometry_enabled(true);
    motor.enable_velocity_mode(100.0, GAINS).unwrap();

    motor.set(-0.3);
    rig.run_for(Duration::from_secs(6), &[&plant]);
    let v = motor.velocity().unwrap();
    assert!((v + 30.0).abs() < 2.0, "velocity {v}");
}

#[test]
fn test_native_velocity_feedback() {
    let rig = Rig::new();
    let plant = std::sync::Arc::new(
        axon_motor::drivers::SimulatedMotor::new(100.0, Duration::from_millis(100)).with_native_velocity(),
    );
    let motor = axon_motor::Motor::new("flywheel", plant.clone(), rig.ctx.clone());
    motor.set_odometry_enabled(true);
    motor.enable_velocity_mode(100.0, GAINS).unwrap();

    motor.set(0.4);
    rig.run_for(Duration::from_secs(6), &[&plant]);
    assert!((plant.speed() - 40.0).abs() < 2.0, "speed {}", plant.speed());
}

#[test]
fn test_disable_reverts_to_power_mode() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("shooter", 100.0);
    motor.set_odometry_enabled(true);
    motor.enable_velocity_mode(100.0, GAINS).unwrap();
    motor.set(0.5);
    rig.run_for(Duration::from_millis(200), &[&plant]);

    motor.disable_velocity_mode();
    assert!(!motor.is_velocity_mode());
    assert!(!rig.scheduler.is_registered("axon.motor.shooter.velocity"));
    assert_eq!(motor.control_step(), None);

    motor.set(0.25);
    assert_eq!(motor.power(), 0.25);
    rig.run_for(Duration::from_millis(200), &[&plant]);
    assert_eq!(motor.power(), 0.25);
}

#[test]
fn test_enable_requires_odometry_and_positive_max() {
    let rig = Rig::new();
    let (_plant, motor) = rig.motor("shooter", 100.0);

    assert_eq!(
        motor.enable_velocity_mode(100.0, GAINS),
        Err(MotorError::OdometryDisabled {
            motor: "shooter".into()
        })
    );
    motor.set_odometry_enabled(true);
    assert!(matches!(
        motor.enable_velocity_mode(-5.0, GAINS),
        Err(MotorError::InvalidArgument(_))
    ));
    assert!(!rig.scheduler.is_registered("axon.motor.shooter.velocity"));
}

#[test]
fn test_limit_stop_during_velocity_calibration() {
    let rig = Rig::new();
    let (plant, motor) = rig.motor("arm", 100.0);
    plant.set_position(100.0);
    motor.set_odometry_enabled(true);
    motor.enable_velocity_mode(100.0, GAINS).unwrap();
    let switch = std::sync::Arc::new(axon_motor::drivers::SimulatedSwitch::lower_limit(
        "arm.home",
        plant.clone(),
        0.0,
    ));
    motor.reset_position_on_digital_input(switch, None);

    assert!(motor.zero_calibrate(0.3));
    let mut cycles = 0;
    while motor.is_calibrating() && cycles < 2000 {
        rig.cycle(&[&plant]);
        cycles += 1;
    }
    assert!(!motor.is_calibrating());

    // The loop now holds zero velocity.
    rig.run_for(Duration::from_secs(5), &[&plant]);
    assert!(motor.velocity().unwrap().abs() < 1.0);
}

//! # AXON Motor
//!
//! Motor-level services of the control core: periodic odometry sampling
//! with spurious-reading rejection, closed-loop velocity control with
//! torque-speed linearization, timed power with authenticated shutoff
//! timers, and zero calibration against a digital input.
//!
//! # Cycle
//!
//! ```text
//!  Input phase        OdometryRing::sample_all, DigitalTrigger::poll
//!  Standalone phase   TimerAuthority::poll (shutoff expiry)
//!  Output phase       Motor::control_step (velocity mode only)
//! ```
//!
//! # Module Structure
//!
//! - [`hal`] - Hardware traits
//! - [`odometry`] - Per-motor sensors and the shared sampling ring
//! - [`control`] - PID and velocity controller
//! - [`trigger`] - Digital input edge detection
//! - [`elapsed`] - Hardware call latency statistics
//! - [`motor`] - Motor composition
//! - [`drivers`] - Simulated hardware
//! - [`error`] - Error types

pub mod control;
pub mod drivers;
pub mod elapsed;
pub mod error;
pub mod hal;
pub mod motor;
pub mod odometry;
pub mod trigger;

pub use crate::control::{PidGains, VelocityController, linearize_torque};
pub use crate::elapsed::{ElapsedStats, ElapsedTimer};
pub use crate::error::{MotorError, MotorResult};
pub use crate::hal::{DigitalInput, MotorHardware, VelocityReading};
pub use crate::motor::{Motor, MotorContext};
pub use crate::odometry::{MotorOdometry, OdometryRing, OdometrySensor, SAMPLE_TASK_NAME};
pub use crate::trigger::{DigitalTrigger, TriggerHandler};

//! Hardware driver implementations.

pub mod simulation;

pub use simulation::{SimulatedMotor, SimulatedSwitch};

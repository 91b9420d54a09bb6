//! Error types for motor operations.

use axon_timer::TimerError;
use thiserror::Error;

/// Errors returned by motor, odometry and controller operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MotorError {
    /// Odometry was read while the motor is not in the odometry ring.
    #[error("Motor odometry is not enabled (motor={motor})")]
    OdometryDisabled {
        /// Motor name
        motor: String,
    },

    /// A numeric argument was out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The hardware binding does not implement the operation.
    #[error("Operation not supported by this motor hardware: {0}")]
    Unsupported(String),

    /// The shutoff timer rejected an operation.
    #[error("Shutoff timer error: {0}")]
    Timer(#[from] TimerError),
}

/// Result type for motor operations.
pub type MotorResult<T> = Result<T, MotorError>;

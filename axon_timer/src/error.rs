//! Error types for timer operations.

use thiserror::Error;

/// Errors returned by [`Timer`](crate::Timer) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// `arm` on a timer that is still armed.
    #[error("Timer {timer} is already armed; wait for it to expire or cancel it first")]
    AlreadyArmed {
        /// Timer name
        timer: String,
    },

    /// `expire` presented a token that is not the current arming's token.
    #[error("Security violation: expire on timer {timer} presented a stale or foreign token")]
    SecurityViolation {
        /// Timer name
        timer: String,
    },
}

/// Result type for timer operations.
pub type TimerResult<T> = Result<T, TimerError>;

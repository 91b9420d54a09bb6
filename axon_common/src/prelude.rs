//! Prelude module for common re-exports.
//!
//! ```rust
//! use axon_common::prelude::*;
//! ```

// ─── Time ───────────────────────────────────────────────────────────
pub use crate::clock::{Clock, ManualClock, MonotonicClock};

// ─── Scheduling ─────────────────────────────────────────────────────
pub use crate::scheduler::{CooperativeScheduler, TaskCallback, TaskScheduler, TaskType};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{AxonConfig, ConfigError, ConfigLoader, LogLevel, SharedConfig};

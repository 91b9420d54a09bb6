//! AXON Common Library
//!
//! This crate provides the shared vocabulary of the AXON control core:
//! time sources, the periodic-task scheduler contract and configuration
//! loading.
//!
//! # Module Structure
//!
//! - [`clock`] - Monotonic and manually driven time sources
//! - [`scheduler`] - Task scheduler contract and the cooperative scheduler
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use axon_common::prelude::*;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new());
//! let scheduler = CooperativeScheduler::new(clock.clone());
//! assert_eq!(scheduler.task_count(), 0);
//! ```

pub mod clock;
pub mod config;
pub mod consts;
pub mod prelude;
pub mod scheduler;

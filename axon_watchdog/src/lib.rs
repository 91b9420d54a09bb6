//! # AXON Watchdog
//!
//! Deadlock detection for worker threads. A thread registers a watchdog
//! with the [`WatchdogRegistry`] and sends heartbeats while it makes
//! progress. A periodic sweep flags every watchdog whose heartbeat is
//! overdue and logs the owner's captured stack, which points at where the
//! thread got stuck.
//!
//! # Module Structure
//!
//! - [`watchdog`] - A single per-thread liveness monitor
//! - [`registry`] - Membership and the expiry sweep
//! - [`report`] - Expiry reports and diagnostics
//!
//! # Ownership Rules
//!
//! | Operation | Caller |
//! |-----------|--------|
//! | `register` | Monitored thread (becomes owner) |
//! | `send_heartbeat` | Owner only |
//! | `pause` / `resume` | Any thread |
//! | `unregister` | Owner only |
//! | `sweep` | Scheduler |
//!
//! Owner-only calls made from another thread are logged with the caller's
//! stack and otherwise ignored. The watchdog never panics on misuse.

#![deny(missing_docs)]

pub mod registry;
pub mod report;
pub mod watchdog;

pub use crate::registry::{SWEEP_TASK_NAME, WatchdogRegistry};
pub use crate::report::{ExpiryReport, OwnerThread};
pub use crate::watchdog::Watchdog;

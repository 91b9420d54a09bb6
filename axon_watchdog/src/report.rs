//! Expiry reports and diagnostic output.
//!
//! All watchdog diagnostics go through `tracing` at `WARN` under the
//! `axon::watchdog` target, each with a full stack dump of the implicated
//! thread.

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::warn;

/// Identity of a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerThread {
    /// Runtime thread id.
    pub id: ThreadId,
    /// Thread name, if the thread was named.
    pub name: Option<String>,
}

impl OwnerThread {
    /// Identity of the calling thread.
    pub fn current() -> Self {
        let current = thread::current();
        Self {
            id: current.id(),
            name: current.name().map(str::to_string),
        }
    }

    /// Whether the calling thread is this one.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }
}

impl fmt::Display for OwnerThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({:?})", self.id),
            None => write!(f, "<unnamed> ({:?})", self.id),
        }
    }
}

/// Raised by a sweep when a watchdog's heartbeat is overdue.
#[derive(Debug, Clone)]
pub struct ExpiryReport {
    /// Watchdog name.
    pub watchdog: String,
    /// Thread being monitored.
    pub owner: OwnerThread,
    /// Configured heartbeat threshold.
    pub threshold: Duration,
    /// Deadline that was missed.
    pub deadline: Duration,
    /// Clock time at which the sweep detected expiry.
    pub detected_at: Duration,
    /// Stack of the monitored thread at its last checkpoint.
    pub stack: Arc<Backtrace>,
}

impl ExpiryReport {
    /// How far past the deadline the sweep ran.
    pub fn overdue(&self) -> Duration {
        self.detected_at.saturating_sub(self.deadline)
    }
}

pub(crate) fn log_expiry(report: &ExpiryReport) {
    warn!(
        target: "axon::watchdog",
        watchdog = %report.watchdog,
        owner = %report.owner,
        at_s = report.detected_at.as_secs_f64(),
        threshold_ms = report.threshold.as_millis() as u64,
        overdue_ms = report.overdue().as_millis() as u64,
        "Watchdog {} expired; monitored thread stack:\n{}",
        report.watchdog,
        report.stack
    );
}

pub(crate) fn log_cross_thread(operation: &str, watchdog: &str, owner: &OwnerThread) {
    let caller = OwnerThread::current();
    warn!(
        target: "axon::watchdog",
        watchdog = %watchdog,
        owner = %owner,
        caller = %caller,
        "Only the owning thread may {} watchdog {}; call ignored. Caller stack:\n{}",
        operation,
        watchdog,
        Backtrace::force_capture()
    );
}

pub(crate) fn log_registry_warning(message: &str, watchdog: &str) {
    warn!(
        target: "axon::watchdog",
        watchdog = %watchdog,
        caller = %OwnerThread::current(),
        "{}. Caller stack:\n{}",
        message,
        Backtrace::force_capture()
    );
}

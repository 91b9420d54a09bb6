//! A single per-thread liveness monitor.

use crate::report::{self, ExpiryReport, OwnerThread};
use axon_common::clock::Clock;
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Mutable part of a watchdog, guarded independently of the registry.
struct WatchdogState {
    deadline: Duration,
    expired: bool,
    paused: bool,
    /// Owner stack at registration or at the last heartbeat.
    stack: Arc<Backtrace>,
}

/// Liveness monitor bound to the thread that registered it.
///
/// Obtained from [`WatchdogRegistry::register`](crate::WatchdogRegistry::register).
pub struct Watchdog {
    name: String,
    threshold: Duration,
    owner: OwnerThread,
    clock: Arc<dyn Clock>,
    capture_heartbeat_stack: bool,
    state: Mutex<WatchdogState>,
}

impl Watchdog {
    /// Create a watchdog owned by the calling thread.
    pub(crate) fn new(
        name: &str,
        threshold: Duration,
        clock: Arc<dyn Clock>,
        capture_heartbeat_stack: bool,
    ) -> Self {
        let deadline = clock.now().saturating_add(threshold);
        Self {
            name: name.to_string(),
            threshold,
            owner: OwnerThread::current(),
            clock,
            capture_heartbeat_stack,
            state: Mutex::new(WatchdogState {
                deadline,
                expired: false,
                paused: false,
                stack: Arc::new(Backtrace::force_capture()),
            }),
        }
    }

    /// Watchdog name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum interval between heartbeats.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Thread that owns this watchdog.
    pub fn owner(&self) -> &OwnerThread {
        &self.owner
    }

    /// Next heartbeat deadline.
    pub fn deadline(&self) -> Duration {
        self.state.lock().deadline
    }

    /// Whether the last sweep found the heartbeat overdue.
    pub fn is_expired(&self) -> bool {
        self.state.lock().expired
    }

    /// Whether expiry detection is suspended.
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Whether the calling thread owns this watchdog.
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner.is_current()
    }

    /// Push the deadline out by one threshold.
    ///
    /// Clears both the expired and paused flags. Only the owning thread may
    /// send heartbeats; calls from other threads are logged and ignored.
    pub fn send_heartbeat(&self) {
        if !self.owner.is_current() {
            report::log_cross_thread("send a heartbeat to", &self.name, &self.owner);
            return;
        }

        let now = self.clock.now();
        let stack = self
            .capture_heartbeat_stack
            .then(|| Arc::new(Backtrace::force_capture()));

        let mut state = self.state.lock();
        state.deadline = now.saturating_add(self.threshold);
        state.expired = false;
        state.paused = false;
        if let Some(stack) = stack {
            state.stack = stack;
        }
    }

    /// Suspend expiry detection, e.g. before a known long wait.
    ///
    /// Any thread may pause. Cleared by [`resume`](Self::resume) or the next
    /// heartbeat.
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    /// Re-enable expiry detection.
    pub fn resume(&self) {
        self.state.lock().paused = false;
    }

    /// Mark the watchdog expired if its deadline passed before `now`.
    ///
    /// Returns a report only on the transition to expired, so a stall is
    /// reported once until the next heartbeat.
    pub(crate) fn check_expiration(&self, now: Duration) -> Option<ExpiryReport> {
        let mut state = self.state.lock();
        if state.paused || state.expired || now <= state.deadline {
            return None;
        }
        state.expired = true;
        Some(ExpiryReport {
            watchdog: self.name.clone(),
            owner: self.owner.clone(),
            threshold: self.threshold,
            deadline: state.deadline,
            detected_at: now,
            stack: state.stack.clone(),
        })
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Watchdog")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field("owner", &self.owner)
            .field("deadline", &state.deadline)
            .field("expired", &state.expired)
            .field("paused", &state.paused)
            .finish()
    }
}

impl fmt::Display for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "[{:.3}] {}: threshold={:.3}, expiredTime={:.3}, expired={}, paused={}",
            self.clock.now().as_secs_f64(),
            self.name,
            self.threshold.as_secs_f64(),
            state.deadline.as_secs_f64(),
            state.expired,
            state.paused
        )
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

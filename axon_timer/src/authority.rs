//! Timer authority: token issuing and expiry.
//!
//! The authority keeps every armed timer in a deadline-ordered pending set.
//! [`TimerAuthority::poll`] pops the entries whose deadline has passed and
//! expires each timer with the token recorded at arm time. The pending lock
//! is released before any timer is touched, so lock order is always
//! timer → authority.

use crate::timer::Timer;
use axon_common::clock::Clock;
use axon_common::config::TimerConfig;
use axon_common::scheduler::{TaskScheduler, TaskType};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info};

/// Scheduler task name of the expiry poll.
pub const POLL_TASK_NAME: &str = "axon.timer.poll";

/// Credential binding one arming of one timer to the authority.
///
/// `id` is unique per authority, `nonce` is the timer's arming generation.
/// Both must match for an expiry to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    id: u64,
    nonce: u64,
}

impl TimerToken {
    pub(crate) fn new(id: u64, nonce: u64) -> Self {
        Self { id, nonce }
    }

    /// Authority-issued id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct PendingEntry {
    timer: Weak<Timer>,
    token: TimerToken,
}

#[derive(Default)]
struct PendingSet {
    by_deadline: BTreeMap<(Duration, u64), PendingEntry>,
    deadline_of: HashMap<u64, Duration>,
}

/// Sole authority allowed to expire timers.
pub struct TimerAuthority {
    clock: Arc<dyn Clock>,
    config: TimerConfig,
    next_id: AtomicU64,
    pending: Mutex<PendingSet>,
}

impl TimerAuthority {
    /// Create an authority with no pending timers.
    pub fn new(clock: Arc<dyn Clock>, config: TimerConfig) -> Self {
        Self {
            clock,
            config,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(PendingSet::default()),
        }
    }

    /// Clock used for deadlines.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Record an arming and issue its token.
    pub(crate) fn add(&self, timer: Weak<Timer>, deadline: Duration, nonce: u64) -> TimerToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = TimerToken::new(id, nonce);
        let mut pending = self.pending.lock();
        pending
            .by_deadline
            .insert((deadline, id), PendingEntry { timer, token });
        pending.deadline_of.insert(id, deadline);
        token
    }

    /// Drop the pending entry for `token`. Returns whether it was pending.
    pub(crate) fn remove(&self, token: TimerToken) -> bool {
        let mut pending = self.pending.lock();
        match pending.deadline_of.remove(&token.id) {
            Some(deadline) => pending.by_deadline.remove(&(deadline, token.id)).is_some(),
            None => false,
        }
    }

    /// Expire every timer whose deadline has been reached.
    ///
    /// Timers are expired in deadline order. Entries whose timer was dropped
    /// or whose token no longer matches are discarded. Returns the number of
    /// timers expired.
    pub fn poll(&self) -> usize {
        let now = self.clock.now();
        let due = {
            let mut pending = self.pending.lock();
            let mut due = Vec::new();
            while let Some(entry) = pending.by_deadline.first_entry() {
                if entry.key().0 > now {
                    break;
                }
                let entry = entry.remove();
                pending.deadline_of.remove(&entry.token.id);
                due.push(entry);
            }
            due
        };

        let mut expired = 0;
        for entry in due {
            let Some(timer) = entry.timer.upgrade() else {
                debug!("Discarding expiry for dropped timer (id={})", entry.token.id);
                continue;
            };
            match timer.expire(entry.token) {
                Ok(()) => expired += 1,
                Err(e) => debug!("Discarding stale expiry (id={}): {e}", entry.token.id),
            }
        }
        expired
    }

    /// Number of armed timers awaiting expiry.
    pub fn pending(&self) -> usize {
        self.pending.lock().by_deadline.len()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending
            .lock()
            .by_deadline
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// Run [`poll`](Self::poll) from `scheduler` at the configured interval.
    pub fn attach(self: &Arc<Self>, scheduler: &dyn TaskScheduler) {
        let weak = Arc::downgrade(self);
        scheduler.register_periodic(
            POLL_TASK_NAME,
            TaskType::Standalone,
            self.config.poll_interval(),
            Arc::new(move |_| {
                if let Some(authority) = weak.upgrade() {
                    authority.poll();
                }
            }),
        );
        info!(
            "Timer authority attached (poll interval={}ms)",
            self.config.poll_interval_ms
        );
    }

    /// Stop the scheduled poll.
    pub fn detach(&self, scheduler: &dyn TaskScheduler) -> bool {
        scheduler.unregister_periodic(POLL_TASK_NAME)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

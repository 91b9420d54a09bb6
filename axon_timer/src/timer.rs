//! The re-armable one-shot timer.

use crate::authority::{TimerAuthority, TimerToken};
use crate::error::{TimerError, TimerResult};
use crate::event::{TimerNotify, TimerOutcome};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Default)]
struct TimerState {
    deadline: Option<Duration>,
    expired: bool,
    canceled: bool,
    target: Option<Arc<dyn TimerNotify>>,
    token: Option<TimerToken>,
    generation: u64,
}

/// One-shot timer expired only by its [`TimerAuthority`].
///
/// A timer may be armed again once it has expired or been canceled. Each
/// arming resolves exactly once and notifies its own target.
pub struct Timer {
    name: String,
    this: Weak<Timer>,
    authority: Arc<TimerAuthority>,
    state: Mutex<TimerState>,
}

impl Timer {
    /// Create an idle timer bound to `authority`.
    pub fn new(name: &str, authority: &Arc<TimerAuthority>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name: name.to_string(),
            this: this.clone(),
            authority: Arc::clone(authority),
            state: Mutex::new(TimerState::default()),
        })
    }

    /// Timer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arm the timer to expire `delay` from now.
    ///
    /// `target` is notified once when this arming resolves. Fails with
    /// [`TimerError::AlreadyArmed`] while a previous arming is pending,
    /// leaving that arming untouched. A delay past the end of the clock's
    /// range saturates, so the timer stays pending until canceled.
    pub fn arm(&self, delay: Duration, target: Option<Arc<dyn TimerNotify>>) -> TimerResult<()> {
        let mut state = self.state.lock();
        if state.token.is_some() {
            return Err(TimerError::AlreadyArmed {
                timer: self.name.clone(),
            });
        }

        let deadline = self.authority.clock().now().saturating_add(delay);
        if let Some(target) = &target {
            target.armed();
        }
        state.generation += 1;
        state.deadline = Some(deadline);
        state.expired = false;
        state.canceled = false;
        state.target = target;
        state.token = Some(
            self.authority
                .add(self.this.clone(), deadline, state.generation),
        );
        debug!(
            "Timer {} armed (delay={}ms, generation={})",
            self.name,
            delay.as_millis(),
            state.generation
        );
        Ok(())
    }

    /// Cancel the pending arming, if any.
    ///
    /// The target of that arming is notified with
    /// [`TimerOutcome::Canceled`]. Canceling an idle, expired or already
    /// canceled timer does nothing.
    pub fn cancel(&self) {
        let target = {
            let mut state = self.state.lock();
            let Some(token) = state.token.take() else {
                return;
            };
            self.authority.remove(token);
            state.canceled = true;
            state.deadline = None;
            state.target.take()
        };
        debug!("Timer {} canceled", self.name);
        if let Some(target) = target {
            target.notify(&self.name, TimerOutcome::Canceled);
        }
    }

    /// Expire the current arming. Only the authority holds tokens.
    pub(crate) fn expire(&self, token: TimerToken) -> TimerResult<()> {
        let target = {
            let mut state = self.state.lock();
            if state.token != Some(token) {
                warn!(
                    target: "axon::timer",
                    "Rejected expiry of timer {} with a stale token (id={})",
                    self.name,
                    token.id()
                );
                return Err(TimerError::SecurityViolation {
                    timer: self.name.clone(),
                });
            }
            state.token = None;
            state.expired = true;
            state.target.take()
        };
        debug!("Timer {} expired", self.name);
        if let Some(target) = target {
            target.notify(&self.name, TimerOutcome::Expired);
        }
        Ok(())
    }

    /// Whether the last arming expired.
    pub fn is_expired(&self) -> bool {
        self.state.lock().expired
    }

    /// Whether an arming is pending.
    pub fn is_active(&self) -> bool {
        self.state.lock().token.is_some()
    }

    /// Whether the last arming was canceled.
    pub fn is_canceled(&self) -> bool {
        self.state.lock().canceled
    }

    /// Deadline of the pending arming.
    pub fn deadline(&self) -> Option<Duration> {
        let state = self.state.lock();
        state.token.and(state.deadline)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(token) = self.state.get_mut().token.take() {
            self.authority.remove(token);
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("deadline", &state.deadline)
            .field("active", &state.token.is_some())
            .field("expired", &state.expired)
            .field("canceled", &state.canceled)
            .field("generation", &state.generation)
            .finish()
    }
}

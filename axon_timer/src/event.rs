//! Notification targets.
//!
//! A timer notifies its target exactly once per arming: with
//! [`TimerOutcome::Expired`] when the authority expires it, or with
//! [`TimerOutcome::Canceled`] when it is canceled first. Targets are always
//! invoked with no timer lock held, except [`TimerNotify::armed`].

use parking_lot::Mutex;
use std::fmt;

/// How an arming was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The deadline passed and the authority expired the timer.
    Expired,
    /// The timer was canceled before it expired.
    Canceled,
}

/// Receiver of timer resolutions.
pub trait TimerNotify: Send + Sync {
    /// Called once when the arming carrying this target resolves.
    fn notify(&self, timer: &str, outcome: TimerOutcome);

    /// Called while the timer is being armed with this target.
    ///
    /// Runs under the timer's lock; must not call back into the timer.
    fn armed(&self) {}
}

impl<F> TimerNotify for F
where
    F: Fn(&str, TimerOutcome) + Send + Sync,
{
    fn notify(&self, timer: &str, outcome: TimerOutcome) {
        self(timer, outcome)
    }
}

/// Observable state of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventState {
    /// Waiting.
    #[default]
    Cleared,
    /// Signaled by an expiry.
    Signaled,
    /// Canceled before it could be signaled.
    Canceled,
}

#[derive(Debug, Default)]
struct EventInner {
    state: EventState,
    signals: u32,
    cancels: u32,
}

/// Latching event, usable as a timer target.
///
/// Expiry signals the event, cancellation cancels it and arming clears it.
/// The signal and cancel counters are cumulative and survive `clear`.
pub struct Event {
    name: String,
    inner: Mutex<EventInner>,
}

impl Event {
    /// Create a cleared event.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Mutex::new(EventInner::default()),
        }
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark signaled.
    pub fn signal(&self) {
        let mut inner = self.inner.lock();
        inner.state = EventState::Signaled;
        inner.signals += 1;
    }

    /// Mark canceled.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        inner.state = EventState::Canceled;
        inner.cancels += 1;
    }

    /// Return to the waiting state.
    pub fn clear(&self) {
        self.inner.lock().state = EventState::Cleared;
    }

    /// Current state.
    pub fn state(&self) -> EventState {
        self.inner.lock().state
    }

    /// Whether the event is signaled.
    pub fn is_signaled(&self) -> bool {
        self.state() == EventState::Signaled
    }

    /// Whether the event is canceled.
    pub fn is_canceled(&self) -> bool {
        self.state() == EventState::Canceled
    }

    /// Total number of signals received.
    pub fn signal_count(&self) -> u32 {
        self.inner.lock().signals
    }

    /// Total number of cancellations received.
    pub fn cancel_count(&self) -> u32 {
        self.inner.lock().cancels
    }
}

impl TimerNotify for Event {
    fn notify(&self, _timer: &str, outcome: TimerOutcome) {
        match outcome {
            TimerOutcome::Expired => self.signal(),
            TimerOutcome::Canceled => self.cancel(),
        }
    }

    fn armed(&self) {
        self.clear();
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("signals", &inner.signals)
            .field("cancels", &inner.cancels)
            .finish()
    }
}

//! Opt-in latency statistics for hardware calls.
//!
//! Two [`ElapsedTimer`]s are shared by every motor on a
//! [`MotorContext`](crate::motor::MotorContext): one for encoder reads in
//! the odometry sweep, one for power writes. Both are disabled by
//! default; a disabled timer only costs an atomic load per call.

use axon_common::clock::Clock;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Accumulated call timings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElapsedStats {
    /// Number of timed calls
    pub count: u64,
    /// Sum of all call durations
    pub total: Duration,
    /// Fastest call
    pub min: Duration,
    /// Slowest call
    pub max: Duration,
}

impl ElapsedStats {
    /// Mean call duration, zero when nothing was recorded.
    pub fn average(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64),
        }
    }

    fn record(&mut self, elapsed: Duration) {
        if self.count == 0 || elapsed < self.min {
            self.min = elapsed;
        }
        self.max = self.max.max(elapsed);
        self.total = self.total.saturating_add(elapsed);
        self.count += 1;
    }
}

/// Named latency recorder.
pub struct ElapsedTimer {
    name: String,
    enabled: AtomicBool,
    stats: Mutex<ElapsedStats>,
}

impl ElapsedTimer {
    /// Disabled timer.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: AtomicBool::new(false),
            stats: Mutex::new(ElapsedStats::default()),
        }
    }

    /// Timer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start or stop recording. Enabling discards earlier statistics.
    pub fn set_enabled(&self, enabled: bool) {
        if enabled && !self.enabled.load(Ordering::Acquire) {
            *self.stats.lock() = ElapsedStats::default();
        }
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether calls are being timed.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Run `call`, recording how long it took on `clock` when enabled.
    pub fn measure<T>(&self, clock: &dyn Clock, call: impl FnOnce() -> T) -> T {
        if !self.is_enabled() {
            return call();
        }
        let start = clock.now();
        let result = call();
        let elapsed = clock.now().saturating_sub(start);
        self.stats.lock().record(elapsed);
        result
    }

    /// Copy of the statistics.
    pub fn stats(&self) -> ElapsedStats {
        *self.stats.lock()
    }

    /// Log the statistics at info level. Does nothing while disabled.
    pub fn report(&self) {
        if !self.is_enabled() {
            return;
        }
        let stats = self.stats();
        info!(
            target: "axon::elapsed",
            timer = %self.name,
            count = stats.count,
            "{self}"
        );
    }
}

impl fmt::Display for ElapsedTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        write!(
            f,
            "{}: count={} avg={:.3}ms min={:.3}ms max={:.3}ms",
            self.name,
            stats.count,
            stats.average().as_secs_f64() * 1e3,
            stats.min.as_secs_f64() * 1e3,
            stats.max.as_secs_f64() * 1e3,
        )
    }
}

impl fmt::Debug for ElapsedTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElapsedTimer")
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("stats", &self.stats())
            .finish()
    }
}

//! Watchdog membership and the periodic expiry sweep.
//!
//! The registry is an explicit context object: the application root builds
//! one, shares it as `Arc<WatchdogRegistry>` and attaches its sweep to the
//! scheduler. One coarse lock serializes membership changes against the
//! sweep; each watchdog's own fields have a separate lock so heartbeats on
//! unrelated watchdogs never contend.

use crate::report::{self, ExpiryReport};
use crate::watchdog::Watchdog;
use axon_common::clock::Clock;
use axon_common::config::WatchdogConfig;
use axon_common::scheduler::{TaskScheduler, TaskType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Scheduler task name of the sweep.
pub const SWEEP_TASK_NAME: &str = "axon.watchdog.sweep";

#[derive(Default)]
struct Members {
    by_name: HashMap<String, Arc<Watchdog>>,
    /// Registration order, swept front to back.
    order: Vec<Arc<Watchdog>>,
}

/// Registry of per-thread watchdogs.
pub struct WatchdogRegistry {
    clock: Arc<dyn Clock>,
    config: WatchdogConfig,
    members: Mutex<Members>,
}

impl WatchdogRegistry {
    /// Create an empty registry.
    pub fn new(clock: Arc<dyn Clock>, config: WatchdogConfig) -> Self {
        Self {
            clock,
            config,
            members: Mutex::new(Members::default()),
        }
    }

    /// Register a watchdog for the calling thread.
    ///
    /// Must be called on the thread to be monitored. Returns `None` (and
    /// logs) if `name` is already registered.
    pub fn register(&self, name: &str, threshold: Duration) -> Option<Arc<Watchdog>> {
        // Stack capture is slow; keep it outside the registry lock.
        let watchdog = Arc::new(Watchdog::new(
            name,
            threshold,
            self.clock.clone(),
            self.config.capture_heartbeat_stack,
        ));

        let mut members = self.members.lock();
        if members.by_name.contains_key(name) {
            drop(members);
            report::log_registry_warning("Watchdog was already registered", name);
            return None;
        }
        members.by_name.insert(name.to_string(), watchdog.clone());
        members.order.push(watchdog.clone());
        debug!(
            "Registered watchdog {name} (threshold={:.3}s, owner={})",
            threshold.as_secs_f64(),
            watchdog.owner()
        );
        Some(watchdog)
    }

    /// Register a watchdog with the configured default threshold.
    pub fn register_default(&self, name: &str) -> Option<Arc<Watchdog>> {
        self.register(name, self.config.default_threshold())
    }

    /// Remove a watchdog. Owner thread only.
    ///
    /// Returns whether the watchdog was registered. A call from any other
    /// thread is logged and returns `false` without touching the registry.
    pub fn unregister(&self, watchdog: &Arc<Watchdog>) -> bool {
        if !watchdog.is_owned_by_current_thread() {
            report::log_cross_thread("unregister", watchdog.name(), watchdog.owner());
            return false;
        }

        let removed = {
            let mut members = self.members.lock();
            let before = members.order.len();
            members.order.retain(|w| !Arc::ptr_eq(w, watchdog));
            let removed = members.order.len() != before;
            if removed {
                members.by_name.remove(watchdog.name());
            }
            removed
        };

        if removed {
            debug!("Unregistered watchdog {}", watchdog.name());
        } else {
            report::log_registry_warning("Watchdog was never registered", watchdog.name());
        }
        removed
    }

    /// Check every watchdog for an overdue heartbeat.
    ///
    /// Each watchdog that newly expired is logged with its owner's stack and
    /// returned. Paused and already-expired watchdogs are skipped.
    pub fn sweep(&self) -> Vec<ExpiryReport> {
        let now = self.clock.now();
        let reports: Vec<ExpiryReport> = {
            let members = self.members.lock();
            members
                .order
                .iter()
                .filter_map(|w| w.check_expiration(now))
                .collect()
        };
        for expiry in &reports {
            report::log_expiry(expiry);
        }
        reports
    }

    /// Run the sweep from `scheduler` at the configured interval.
    pub fn attach(self: &Arc<Self>, scheduler: &dyn TaskScheduler) {
        let weak = Arc::downgrade(self);
        scheduler.register_periodic(
            SWEEP_TASK_NAME,
            TaskType::Standalone,
            self.config.sweep_interval(),
            Arc::new(move |_| {
                if let Some(registry) = weak.upgrade() {
                    registry.sweep();
                }
            }),
        );
        info!(
            "Watchdog sweep attached (interval={}ms)",
            self.config.sweep_interval_ms
        );
    }

    /// Stop the scheduled sweep.
    pub fn detach(&self, scheduler: &dyn TaskScheduler) -> bool {
        scheduler.unregister_periodic(SWEEP_TASK_NAME)
    }

    /// Look up a watchdog by name.
    pub fn get(&self, name: &str) -> Option<Arc<Watchdog>> {
        self.members.lock().by_name.get(name).cloned()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.members
            .lock()
            .order
            .iter()
            .map(|w| w.name().to_string())
            .collect()
    }

    /// Number of registered watchdogs.
    pub fn len(&self) -> usize {
        self.members.lock().order.len()
    }

    /// Whether no watchdog is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

//! Periodic task scheduling.
//!
//! The control core never spawns threads. All periodic work is handed to a
//! [`TaskScheduler`] as named callbacks.
//!
//! # Task Phases
//!
//! | Type | When | Used by |
//! |------|------|---------|
//! | [`TaskType::Input`] | Start of a cycle | Odometry sampling, digital triggers |
//! | [`TaskType::Standalone`] | Middle of a cycle | Watchdog sweep, timer poll |
//! | [`TaskType::Output`] | End of a cycle | Velocity control step |
//! | [`TaskType::Shutdown`] | Exactly once at teardown | Odometry cleanup |
//!
//! [`CooperativeScheduler`] is the in-process implementation: something
//! else (a tokio interval, a test loop) calls [`CooperativeScheduler::run_due`]
//! and the scheduler invokes every task whose interval has elapsed on its
//! [`Clock`].

use crate::clock::Clock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// Phase a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskType {
    /// Runs first in a cycle; reads inputs.
    Input,
    /// Independent of the input/output phases.
    Standalone,
    /// Runs last in a cycle; writes outputs.
    Output,
    /// Runs exactly once when the scheduler shuts down.
    Shutdown,
}

/// Task body. Receives the phase it is being run for.
pub type TaskCallback = Arc<dyn Fn(TaskType) + Send + Sync>;

/// Scheduler contract consumed by the control core.
pub trait TaskScheduler: Send + Sync {
    /// Register (or replace) a named task.
    ///
    /// `interval` is the minimum period between runs; it is ignored for
    /// [`TaskType::Shutdown`]. Returns `false` if a task with the same name
    /// was replaced.
    fn register_periodic(
        &self,
        name: &str,
        task_type: TaskType,
        interval: Duration,
        callback: TaskCallback,
    ) -> bool;

    /// Remove a named task. Returns whether it was registered.
    fn unregister_periodic(&self, name: &str) -> bool;

    /// Whether a task with this name is registered.
    fn is_registered(&self, name: &str) -> bool;
}

struct ScheduledTask {
    name: String,
    task_type: TaskType,
    interval: Duration,
    next_due: Duration,
    callback: TaskCallback,
}

/// Clock-driven cooperative scheduler.
///
/// Callbacks run on whichever thread calls [`run_due`](Self::run_due), with
/// no scheduler lock held, so a task may register or unregister tasks.
/// Changes made during a cycle take effect on the next cycle.
pub struct CooperativeScheduler {
    clock: Arc<dyn Clock>,
    tasks: Mutex<Vec<ScheduledTask>>,
    shut_down: AtomicBool,
}

impl CooperativeScheduler {
    /// Create a scheduler reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Run every periodic task whose interval has elapsed.
    ///
    /// Tasks run in phase order (input, standalone, output) and in
    /// registration order within a phase. Returns the number of tasks run.
    pub fn run_due(&self) -> usize {
        if self.is_shut_down() {
            return 0;
        }
        let now = self.clock.now();
        let due = {
            let mut tasks = self.tasks.lock();
            let mut due = Vec::new();
            for task in tasks.iter_mut() {
                if task.task_type != TaskType::Shutdown && task.next_due <= now {
                    task.next_due = now.saturating_add(task.interval);
                    due.push((task.task_type, task.callback.clone()));
                }
            }
            due
        };
        Self::invoke(due)
    }

    /// Run every periodic task once, ignoring intervals.
    pub fn run_all(&self) -> usize {
        if self.is_shut_down() {
            return 0;
        }
        let now = self.clock.now();
        let all = {
            let mut tasks = self.tasks.lock();
            tasks
                .iter_mut()
                .filter(|t| t.task_type != TaskType::Shutdown)
                .map(|t| {
                    t.next_due = now.saturating_add(t.interval);
                    (t.task_type, t.callback.clone())
                })
                .collect::<Vec<_>>()
        };
        Self::invoke(all)
    }

    /// Run shutdown tasks. Only the first call has any effect; periodic
    /// tasks stop running afterwards.
    pub fn shutdown(&self) -> usize {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let stop_tasks = {
            let tasks = self.tasks.lock();
            tasks
                .iter()
                .filter(|t| t.task_type == TaskType::Shutdown)
                .map(|t| (t.task_type, t.callback.clone()))
                .collect::<Vec<_>>()
        };
        debug!("Scheduler shutting down, {} shutdown task(s)", stop_tasks.len());
        Self::invoke(stop_tasks)
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of registered tasks of every type.
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Names of registered tasks in registration order.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.lock().iter().map(|t| t.name.clone()).collect()
    }

    fn invoke(mut batch: Vec<(TaskType, TaskCallback)>) -> usize {
        // Stable: registration order is preserved within a phase.
        batch.sort_by_key(|(task_type, _)| *task_type);
        for (task_type, callback) in &batch {
            callback(*task_type);
        }
        batch.len()
    }
}

impl TaskScheduler for CooperativeScheduler {
    fn register_periodic(
        &self,
        name: &str,
        task_type: TaskType,
        interval: Duration,
        callback: TaskCallback,
    ) -> bool {
        let now = self.clock.now();
        let mut tasks = self.tasks.lock();
        if let Some(task) = tasks.iter_mut().find(|t| t.name == name) {
            debug!("Replacing task {name} ({task_type:?}, {interval:?})");
            task.task_type = task_type;
            task.interval = interval;
            task.next_due = now;
            task.callback = callback;
            return false;
        }
        trace!("Registering task {name} ({task_type:?}, {interval:?})");
        tasks.push(ScheduledTask {
            name: name.to_string(),
            task_type,
            interval,
            next_due: now,
            callback,
        });
        true
    }

    fn unregister_periodic(&self, name: &str) -> bool {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| t.name != name);
        let removed = tasks.len() != before;
        if removed {
            trace!("Unregistered task {name}");
        }
        removed
    }

    fn is_registered(&self, name: &str) -> bool {
        self.tasks.lock().iter().any(|t| t.name == name)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

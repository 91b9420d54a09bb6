//! Edge detection on a polled digital input.

use crate::hal::DigitalInput;
use axon_common::scheduler::{TaskScheduler, TaskType};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

/// Called with the new input state on every change.
pub type TriggerHandler = Arc<dyn Fn(bool) + Send + Sync>;

struct TriggerState {
    enabled: bool,
    last: bool,
}

/// Polls a [`DigitalInput`] from an input-phase task and invokes a handler
/// whenever its state changes while the trigger is enabled.
pub struct DigitalTrigger {
    task_name: String,
    input: Arc<dyn DigitalInput>,
    handler: TriggerHandler,
    scheduler: Arc<dyn TaskScheduler>,
    interval: Duration,
    this: Weak<DigitalTrigger>,
    state: Mutex<TriggerState>,
}

impl DigitalTrigger {
    /// Create a disabled trigger. `task_name` must be unique per scheduler.
    pub fn new(
        task_name: &str,
        input: Arc<dyn DigitalInput>,
        handler: TriggerHandler,
        scheduler: Arc<dyn TaskScheduler>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            task_name: task_name.to_string(),
            input,
            handler,
            scheduler,
            interval,
            this: this.clone(),
            state: Mutex::new(TriggerState {
                enabled: false,
                last: false,
            }),
        })
    }

    /// The polled input.
    pub fn input(&self) -> &Arc<dyn DigitalInput> {
        &self.input
    }

    /// Start polling. The state at this moment is the baseline, so only
    /// later changes fire the handler.
    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut state = self.state.lock();
            if state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
            if enabled {
                state.last = self.input.is_active();
            }
        }
        if enabled {
            let weak = self.this.clone();
            self.scheduler.register_periodic(
                &self.task_name,
                TaskType::Input,
                self.interval,
                Arc::new(move |_| {
                    if let Some(trigger) = weak.upgrade() {
                        trigger.poll();
                    }
                }),
            );
        } else {
            self.scheduler.unregister_periodic(&self.task_name);
        }
        debug!(
            "Digital trigger {} {}",
            self.input.name(),
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Whether the trigger is polling.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Read the input once; returns whether the handler fired.
    pub fn poll(&self) -> bool {
        let active = self.input.is_active();
        {
            let mut state = self.state.lock();
            if !state.enabled || state.last == active {
                return false;
            }
            state.last = active;
        }
        trace!("Digital input {} changed (active={active})", self.input.name());
        (self.handler)(active);
        true
    }
}

impl Drop for DigitalTrigger {
    fn drop(&mut self) {
        if self.state.get_mut().enabled {
            self.scheduler.unregister_periodic(&self.task_name);
        }
    }
}

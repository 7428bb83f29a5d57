//! Test double for [`LifecycleReporter`] that records structured events for
//! assertions.

use std::cell::RefCell;

use kindle_config::KindleConfig;
use kindle_ioc::BindingKey;

use crate::application::BootstrapError;
use crate::bootstrapper::BootstrapperId;
use crate::dispatcher::{DispatchError, DispatchMode, DispatchTrigger};
use crate::lifecycle::LifecycleReporter;
use crate::registry::BootstrapperDescriptor;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    DispatchStarting(DispatchMode),
    DispatchCompleted(DispatchMode),
    DispatchFailed(String),
    LazyBindingInstalled(String),
    BootstrapperStarting { id: String, trigger: DispatchTrigger },
    BootstrapperReady(String),
    BootstrapperReused(String),
    ShutdownStarting(usize),
    ShutdownCompleted(usize),
    ApplicationStarting,
    ApplicationReady,
    ApplicationFailed(String),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: RefCell<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.borrow().clone()
    }

    /// Identifiers reported as starting, in order.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                LifecycleEvent::BootstrapperStarting { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn dispatch_starting(&self, mode: DispatchMode, _eager: usize, _lazy: usize) {
        self.record(LifecycleEvent::DispatchStarting(mode));
    }

    fn dispatch_completed(&self, mode: DispatchMode) {
        self.record(LifecycleEvent::DispatchCompleted(mode));
    }

    fn dispatch_failed(&self, error: &DispatchError) {
        self.record(LifecycleEvent::DispatchFailed(error.to_string()));
    }

    fn lazy_binding_installed(&self, key: &BindingKey, _descriptor: &BootstrapperDescriptor) {
        self.record(LifecycleEvent::LazyBindingInstalled(key.to_string()));
    }

    fn bootstrapper_starting(&self, id: &BootstrapperId, trigger: &DispatchTrigger) {
        self.record(LifecycleEvent::BootstrapperStarting {
            id: id.to_string(),
            trigger: trigger.clone(),
        });
    }

    fn bootstrapper_ready(&self, id: &BootstrapperId) {
        self.record(LifecycleEvent::BootstrapperReady(id.to_string()));
    }

    fn bootstrapper_reused(&self, id: &BootstrapperId, _key: &BindingKey) {
        self.record(LifecycleEvent::BootstrapperReused(id.to_string()));
    }

    fn shutdown_starting(&self, count: usize) {
        self.record(LifecycleEvent::ShutdownStarting(count));
    }

    fn shutdown_completed(&self, count: usize) {
        self.record(LifecycleEvent::ShutdownCompleted(count));
    }

    fn application_starting(&self) {
        self.record(LifecycleEvent::ApplicationStarting);
    }

    fn application_ready(&self, _config: &KindleConfig) {
        self.record(LifecycleEvent::ApplicationReady);
    }

    fn application_failed(&self, error: &BootstrapError) {
        self.record(LifecycleEvent::ApplicationFailed(error.to_string()));
    }
}

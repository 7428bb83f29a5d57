//! Structured reporting for dispatch and application lifecycle events.

use std::rc::Rc;

use kindle_config::KindleConfig;
use kindle_ioc::BindingKey;

use crate::application::BootstrapError;
use crate::bootstrapper::BootstrapperId;
use crate::dispatcher::{DispatchError, DispatchMode, DispatchTrigger};
use crate::registry::BootstrapperDescriptor;

const LIFECYCLE_TARGET: &str = "kindle_bootstrap::lifecycle";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter {
    /// Invoked before a dispatch pass touches the container.
    fn dispatch_starting(&self, mode: DispatchMode, eager: usize, lazy: usize);

    /// Invoked after a dispatch pass returns successfully.
    fn dispatch_completed(&self, mode: DispatchMode);

    /// Invoked when a dispatch pass or a lazily triggered bootstrapper fails.
    fn dispatch_failed(&self, error: &DispatchError);

    /// Invoked once a lazy factory is installed for `key`.
    fn lazy_binding_installed(&self, key: &BindingKey, descriptor: &BootstrapperDescriptor);

    /// Invoked before a bootstrapper's lifecycle hooks run.
    fn bootstrapper_starting(&self, id: &BootstrapperId, trigger: &DispatchTrigger);

    /// Invoked after a bootstrapper completed `run`.
    fn bootstrapper_ready(&self, id: &BootstrapperId);

    /// Invoked when a lazy binding is triggered for a bootstrapper that
    /// already ran.
    fn bootstrapper_reused(&self, id: &BootstrapperId, key: &BindingKey);

    /// Invoked before the shutdown task releases `count` bootstrappers.
    fn shutdown_starting(&self, count: usize);

    /// Invoked after every active bootstrapper shut down.
    fn shutdown_completed(&self, count: usize);

    /// Invoked before configuration loading begins.
    fn application_starting(&self);

    /// Invoked after the application kernel bootstrapped successfully.
    fn application_ready(&self, config: &KindleConfig);

    /// Invoked when the application kernel fails to bootstrap.
    fn application_failed(&self, error: &BootstrapError);
}

impl<T> LifecycleReporter for Rc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn dispatch_starting(&self, mode: DispatchMode, eager: usize, lazy: usize) {
        (**self).dispatch_starting(mode, eager, lazy);
    }

    fn dispatch_completed(&self, mode: DispatchMode) {
        (**self).dispatch_completed(mode);
    }

    fn dispatch_failed(&self, error: &DispatchError) {
        (**self).dispatch_failed(error);
    }

    fn lazy_binding_installed(&self, key: &BindingKey, descriptor: &BootstrapperDescriptor) {
        (**self).lazy_binding_installed(key, descriptor);
    }

    fn bootstrapper_starting(&self, id: &BootstrapperId, trigger: &DispatchTrigger) {
        (**self).bootstrapper_starting(id, trigger);
    }

    fn bootstrapper_ready(&self, id: &BootstrapperId) {
        (**self).bootstrapper_ready(id);
    }

    fn bootstrapper_reused(&self, id: &BootstrapperId, key: &BindingKey) {
        (**self).bootstrapper_reused(id, key);
    }

    fn shutdown_starting(&self, count: usize) {
        (**self).shutdown_starting(count);
    }

    fn shutdown_completed(&self, count: usize) {
        (**self).shutdown_completed(count);
    }

    fn application_starting(&self) {
        (**self).application_starting();
    }

    fn application_ready(&self, config: &KindleConfig) {
        (**self).application_ready(config);
    }

    fn application_failed(&self, error: &BootstrapError) {
        (**self).application_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn dispatch_starting(&self, mode: DispatchMode, eager: usize, lazy: usize) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "dispatch_starting",
            mode = %mode,
            eager,
            lazy,
            "dispatching bootstrappers"
        );
    }

    fn dispatch_completed(&self, mode: DispatchMode) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "dispatch_completed",
            mode = %mode,
            "bootstrapper dispatch completed"
        );
    }

    fn dispatch_failed(&self, error: &DispatchError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "dispatch_failed",
            bootstrapper = error.bootstrapper().map(BootstrapperId::as_str),
            error = %error,
            "bootstrapper dispatch failed"
        );
    }

    fn lazy_binding_installed(&self, key: &BindingKey, descriptor: &BootstrapperDescriptor) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "lazy_binding_installed",
            key = %key,
            bootstrapper = %descriptor.bootstrapper,
            scope = %descriptor.scope(),
            "lazy binding installed"
        );
    }

    fn bootstrapper_starting(&self, id: &BootstrapperId, trigger: &DispatchTrigger) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrapper_starting",
            bootstrapper = %id,
            trigger = %trigger,
            "starting bootstrapper"
        );
    }

    fn bootstrapper_ready(&self, id: &BootstrapperId) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrapper_ready",
            bootstrapper = %id,
            "bootstrapper ready"
        );
    }

    fn bootstrapper_reused(&self, id: &BootstrapperId, key: &BindingKey) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "bootstrapper_reused",
            bootstrapper = %id,
            key = %key,
            "bootstrapper already ran; resolving its binding"
        );
    }

    fn shutdown_starting(&self, count: usize) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_starting",
            count,
            "shutting down bootstrappers"
        );
    }

    fn shutdown_completed(&self, count: usize) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_completed",
            count,
            "bootstrappers shut down"
        );
    }

    fn application_starting(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "application_starting",
            "starting application bootstrap"
        );
    }

    fn application_ready(&self, config: &KindleConfig) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "application_ready",
            force_eager_loading = config.force_eager_loading(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            manifest_cache = config.manifest_cache().map(|path| path.as_str()),
            "application bootstrap completed"
        );
    }

    fn application_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "application_failed",
            error = %error,
            "application bootstrap failed"
        );
    }
}

//! Application kernel: configuration, telemetry, dispatch and lifecycle.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use kindle_config::KindleConfig;
use kindle_ioc::Container;
use kindle_tasks::{TaskDispatcher, TaskError, TaskType};

use crate::dispatcher::{BootstrapperDispatcher, DispatchError};
use crate::lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
use crate::manifest::{ManifestCache, ManifestError, RegistryManifest};
use crate::registry::BootstrapperRegistry;
use crate::telemetry::{self, TelemetryError, TelemetryHandle, TelemetrySettings};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader {
    /// Loads the kernel configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when any configuration layer is malformed.
    fn load(&self) -> Result<KindleConfig, Arc<OrthoError>>;
}

/// Loader that delegates to [`KindleConfig::load_layers`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<KindleConfig, Arc<OrthoError>> {
        KindleConfig::load_layers()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StaticConfigLoader {
    config: KindleConfig,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: KindleConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<KindleConfig, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced while bootstrapping or driving the application.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The registry manifest cache could not be refreshed.
    #[error("failed to refresh the registry manifest cache: {source}")]
    Manifest {
        /// Underlying cache error.
        #[source]
        source: ManifestError,
    },
    /// Bootstrapper dispatch failed.
    #[error("failed to dispatch bootstrappers: {source}")]
    Dispatch {
        /// Underlying dispatch error.
        #[source]
        source: DispatchError,
    },
    /// A lifecycle task failed.
    #[error("lifecycle task failed: {source}")]
    Lifecycle {
        /// Underlying task error.
        #[source]
        source: TaskError,
    },
    /// `start` was called on an application that is not waiting to start.
    #[error("cannot start an application that is {state}")]
    InvalidState {
        /// State the application was in.
        state: ApplicationState,
    },
}

/// Where an [`Application`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationState {
    /// Bootstrappers were dispatched; `start` has not run.
    Bootstrapped,
    /// `start` completed.
    Running,
    /// `shutdown` completed.
    ShutDown,
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Bootstrapped => "bootstrapped",
            Self::Running => "running",
            Self::ShutDown => "shut down",
        })
    }
}

/// Result of a successful bootstrap invocation.
pub struct Application {
    config: KindleConfig,
    dispatcher: BootstrapperDispatcher,
    telemetry: TelemetryHandle,
    state: Cell<ApplicationState>,
}

impl Application {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &KindleConfig {
        &self.config
    }

    /// Container populated by the dispatched bootstrappers.
    #[must_use]
    pub fn container(&self) -> &Container {
        self.dispatcher.container()
    }

    /// Task queues driven by [`Application::start`] and
    /// [`Application::shutdown`].
    #[must_use]
    pub fn tasks(&self) -> &TaskDispatcher {
        self.dispatcher.tasks()
    }

    /// Dispatcher that bootstrapped the application.
    #[must_use]
    pub const fn dispatcher(&self) -> &BootstrapperDispatcher {
        &self.dispatcher
    }

    /// Whether this kernel installed telemetry or joined an earlier one.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ApplicationState {
        self.state.get()
    }

    /// Whether [`Application::start`] completed and shutdown has not run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ApplicationState::Running
    }

    /// Runs the pre-start tasks, `callback`, then the post-start tasks, and
    /// returns what `callback` produced.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidState`] unless the application is
    /// freshly bootstrapped, and [`BootstrapError::Lifecycle`] when a task
    /// fails.
    pub fn start<T, F>(&self, callback: F) -> Result<T, BootstrapError>
    where
        F: FnOnce(&Container) -> T,
    {
        let state = self.state();
        if state != ApplicationState::Bootstrapped {
            return Err(BootstrapError::InvalidState { state });
        }
        self.run_tasks(TaskType::PreStart)?;
        let output = callback(self.container());
        self.state.set(ApplicationState::Running);
        self.run_tasks(TaskType::PostStart)?;
        Ok(output)
    }

    /// Runs the pre-shutdown tasks (which shut down every dispatched
    /// bootstrapper) and then the post-shutdown tasks. Calling it again is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Lifecycle`] with the first task failure.
    /// The post-shutdown tasks run even when a pre-shutdown task failed, and
    /// the application counts as shut down either way.
    pub fn shutdown(&self) -> Result<(), BootstrapError> {
        if self.state() == ApplicationState::ShutDown {
            return Ok(());
        }
        self.state.set(ApplicationState::ShutDown);
        let pre_shutdown = self.run_tasks(TaskType::PreShutdown);
        let post_shutdown = self.run_tasks(TaskType::PostShutdown);
        pre_shutdown.and(post_shutdown)
    }

    fn run_tasks(&self, task_type: TaskType) -> Result<(), BootstrapError> {
        self.tasks()
            .dispatch(task_type)
            .map_err(|source| BootstrapError::Lifecycle { source })
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Application")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Bootstraps `registry` with the process configuration and the `tracing`
/// reporter.
///
/// # Errors
///
/// See [`bootstrap_with`].
pub fn bootstrap<R>(registry: &Rc<R>) -> Result<Application, BootstrapError>
where
    R: BootstrapperRegistry + ?Sized + 'static,
{
    bootstrap_with(
        &SystemConfigLoader,
        Rc::new(StructuredLifecycleReporter::new()),
        registry,
    )
}

/// Bootstraps the application using the supplied collaborators.
///
/// Loads configuration, installs telemetry, refreshes the manifest cache when
/// one is configured, then dispatches `registry` into a fresh container.
///
/// # Errors
///
/// Returns the [`BootstrapError`] of the first step that fails. The reporter
/// observes the failure before it is returned.
pub fn bootstrap_with<R>(
    loader: &dyn ConfigLoader,
    reporter: Rc<dyn LifecycleReporter>,
    registry: &Rc<R>,
) -> Result<Application, BootstrapError>
where
    R: BootstrapperRegistry + ?Sized + 'static,
{
    reporter.application_starting();
    let fail = |error: BootstrapError| {
        reporter.application_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;

    let telemetry = telemetry::initialise(TelemetrySettings::from_config(&config))
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;

    if let Some(path) = config.manifest_cache() {
        ManifestCache::new(path.to_owned())
            .refresh(&RegistryManifest::capture(&**registry))
            .map_err(|source| fail(BootstrapError::Manifest { source }))?;
    }

    let mut dispatcher = BootstrapperDispatcher::with_reporter(
        Rc::new(Container::new()),
        Rc::new(TaskDispatcher::new()),
        Rc::clone(&reporter),
    );
    dispatcher.force_eager_loading(config.force_eager_loading());
    dispatcher
        .dispatch(registry)
        .map_err(|source| fail(BootstrapError::Dispatch { source }))?;

    reporter.application_ready(&config);
    Ok(Application {
        config,
        dispatcher,
        telemetry,
        state: Cell::new(ApplicationState::Bootstrapped),
    })
}

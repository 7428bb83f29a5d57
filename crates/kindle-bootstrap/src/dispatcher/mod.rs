//! Dispatches bootstrappers against the container.
//!
//! A dispatch pass has two paths. The lazy path installs one factory per
//! lazily bound key; resolving such a key runs the owning bootstrapper once
//! and then resolves the real binding it registered. The eager path runs
//! every eager bootstrapper in three passes (`initialize`, then
//! `register_bindings`, then `run`) so that every binding of the pass exists
//! before any `run` hook executes. When eager loading is forced, the
//! bootstrappers behind lazy bindings join the eager path instead.
//!
//! Each pass registers one [`TaskType::PreShutdown`] task that shuts down
//! every bootstrapper the pass brought to life, including those triggered
//! lazily after the task was queued.

mod run_registry;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use kindle_ioc::{BindingKey, Container, ContainerError, Instance};
use kindle_tasks::{TaskDispatcher, TaskType};

use crate::bootstrapper::{
    Bootstrapper, BootstrapperError, BootstrapperHandle, BootstrapperId, LifecyclePhase,
};
use crate::lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
use crate::registry::{
    BootstrapperDescriptor, BootstrapperRegistry, LazyBindingTable, RegistryError,
};

use run_registry::{ActiveBootstrappers, RunRegistry};

type SharedActive = Rc<RefCell<ActiveBootstrappers>>;

/// How a dispatch pass treats lazily bound bootstrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    /// Lazy bindings are deferred until first resolution.
    Lazy,
    /// Every bootstrapper runs during the pass.
    ForcedEager,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Lazy => "lazy",
            Self::ForcedEager => "forced_eager",
        })
    }
}

/// What caused a bootstrapper to start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DispatchTrigger {
    /// The eager path of a dispatch pass.
    Eager,
    /// The first resolution of a lazily bound key.
    Lazy(BindingKey),
}

impl fmt::Display for DispatchTrigger {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => formatter.write_str("eager"),
            Self::Lazy(key) => write!(formatter, "lazy binding '{key}'"),
        }
    }
}

/// Errors surfaced while dispatching bootstrappers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registry could not supply a bootstrapper.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A lifecycle hook returned an error.
    #[error("bootstrapper '{id}' failed during {phase}: {source}")]
    Bootstrapper {
        /// Bootstrapper that failed.
        id: BootstrapperId,
        /// Hook that was running.
        phase: LifecyclePhase,
        /// Error returned by the hook.
        #[source]
        source: BootstrapperError,
    },

    /// A hook was requested while the same bootstrapper was still running
    /// another of its hooks.
    #[error("bootstrapper '{id}' re-entered its own lifecycle during {phase}")]
    Reentrant {
        /// Bootstrapper that was already borrowed.
        id: BootstrapperId,
        /// Hook that could not start.
        phase: LifecyclePhase,
    },

    /// A lazily dispatched bootstrapper ran but its key still could not be
    /// resolved.
    #[error("lazy binding '{key}' could not be resolved after its bootstrapper ran: {source}")]
    Resolution {
        /// Key whose resolution failed.
        key: BindingKey,
        /// Error reported by the container.
        #[source]
        source: ContainerError,
    },
}

impl DispatchError {
    /// Identifier of the bootstrapper involved, when there is one.
    #[must_use]
    pub const fn bootstrapper(&self) -> Option<&BootstrapperId> {
        match self {
            Self::Bootstrapper { id, .. } | Self::Reentrant { id, .. } => Some(id),
            Self::Registry(RegistryError::UnknownBootstrapper { id }) => Some(id),
            Self::Registry(_) | Self::Resolution { .. } => None,
        }
    }

    /// Lifecycle hook that failed, when the failure came from a hook.
    #[must_use]
    pub const fn phase(&self) -> Option<LifecyclePhase> {
        match self {
            Self::Bootstrapper { phase, .. } | Self::Reentrant { phase, .. } => Some(*phase),
            Self::Registry(_) | Self::Resolution { .. } => None,
        }
    }
}

/// Runs bootstrappers eagerly or lazily against a shared container.
pub struct BootstrapperDispatcher {
    container: Rc<Container>,
    tasks: Rc<TaskDispatcher>,
    reporter: Rc<dyn LifecycleReporter>,
    force_eager_loading: bool,
    run_registry: Rc<RefCell<RunRegistry>>,
}

impl BootstrapperDispatcher {
    /// Creates a dispatcher that reports through `tracing`.
    #[must_use]
    pub fn new(container: Rc<Container>, tasks: Rc<TaskDispatcher>) -> Self {
        Self::with_reporter(container, tasks, Rc::new(StructuredLifecycleReporter::new()))
    }

    /// Creates a dispatcher with a custom lifecycle reporter.
    #[must_use]
    pub fn with_reporter(
        container: Rc<Container>,
        tasks: Rc<TaskDispatcher>,
        reporter: Rc<dyn LifecycleReporter>,
    ) -> Self {
        Self {
            container,
            tasks,
            reporter,
            force_eager_loading: false,
            run_registry: Rc::default(),
        }
    }

    /// Chooses whether later dispatch passes ignore lazy semantics.
    pub fn force_eager_loading(&mut self, force: bool) {
        self.force_eager_loading = force;
    }

    /// Mode the next dispatch pass will use.
    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        if self.force_eager_loading {
            DispatchMode::ForcedEager
        } else {
            DispatchMode::Lazy
        }
    }

    /// Whether the bootstrapper `id` has completed its `run` hook.
    #[must_use]
    pub fn has_run(&self, id: &BootstrapperId) -> bool {
        self.run_registry.borrow().contains(id)
    }

    /// Container the dispatcher binds into.
    #[must_use]
    pub const fn container(&self) -> &Rc<Container> {
        &self.container
    }

    /// Task dispatcher receiving the shutdown tasks.
    #[must_use]
    pub const fn tasks(&self) -> &Rc<TaskDispatcher> {
        &self.tasks
    }

    /// Dispatches every bootstrapper declared by `registry`.
    ///
    /// In lazy mode the lazy factories are installed first, so `run` hooks
    /// of eager bootstrappers may resolve lazily bound keys.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Registry`] when the registry names an
    /// unknown or blank identifier (checked before the container is
    /// touched), and the first hook failure of the eager path. Bindings
    /// applied before a failure stay in place.
    ///
    /// The pre-shutdown task is queued before the eager path runs, and an
    /// eager bootstrapper joins the shutdown list once `initialize`
    /// succeeds. After an eager failure the task therefore still shuts down
    /// every bootstrapper that was initialised, including ones that never
    /// reached `register_bindings` or `run`.
    pub fn dispatch<R>(&self, registry: &Rc<R>) -> Result<(), DispatchError>
    where
        R: BootstrapperRegistry + ?Sized + 'static,
    {
        let mode = self.mode();
        let eager = registry.eager_bootstrappers();
        let lazy = registry.lazy_bootstrapper_bindings();
        self.reporter.dispatch_starting(mode, eager.len(), lazy.len());

        let result = validate(&**registry, &eager, &lazy)
            .map_err(DispatchError::from)
            .and_then(|()| {
                let active = SharedActive::default();
                match mode {
                    DispatchMode::ForcedEager => {
                        self.register_shutdown_task(&active);
                        let order = forced_eager_order(eager, &lazy);
                        self.dispatch_eagerly(&**registry, &order, &active)
                    }
                    DispatchMode::Lazy => {
                        self.dispatch_lazily(registry, &lazy, &active);
                        self.register_shutdown_task(&active);
                        self.dispatch_eagerly(&**registry, &eager, &active)
                    }
                }
            });

        match &result {
            Ok(()) => self.reporter.dispatch_completed(mode),
            Err(error) => self.reporter.dispatch_failed(error),
        }
        result
    }

    fn dispatch_eagerly<R>(
        &self,
        registry: &R,
        ids: &[BootstrapperId],
        active: &SharedActive,
    ) -> Result<(), DispatchError>
    where
        R: BootstrapperRegistry + ?Sized,
    {
        let mut initialised = Vec::with_capacity(ids.len());
        for id in ids {
            let handle = registry.resolve(id)?;
            self.reporter
                .bootstrapper_starting(id, &DispatchTrigger::Eager);
            invoke(id, &handle, LifecyclePhase::Initialize, |bootstrapper| {
                bootstrapper.initialize()
            })?;
            active.borrow_mut().insert(id, &handle);
            initialised.push((id, handle));
        }

        for (id, handle) in &initialised {
            invoke(id, handle, LifecyclePhase::RegisterBindings, |bootstrapper| {
                bootstrapper.register_bindings(&self.container)
            })?;
        }

        for (id, handle) in &initialised {
            invoke(id, handle, LifecyclePhase::Run, |bootstrapper| {
                bootstrapper.run(&self.container)
            })?;
            self.run_registry.borrow_mut().record((*id).clone());
            self.reporter.bootstrapper_ready(id);
        }
        Ok(())
    }

    fn dispatch_lazily<R>(&self, registry: &Rc<R>, lazy: &LazyBindingTable, active: &SharedActive)
    where
        R: BootstrapperRegistry + ?Sized + 'static,
    {
        for binding in lazy {
            let factory = LazyFactory {
                registry: Rc::clone(registry),
                key: binding.key.clone(),
                descriptor: binding.descriptor.clone(),
                run_registry: Rc::clone(&self.run_registry),
                active: Rc::clone(active),
                reporter: Rc::clone(&self.reporter),
            };
            self.container
                .scoped(binding.descriptor.scope())
                .bind_factory(binding.key.clone(), move |container| {
                    factory.produce(container).map_err(Into::into)
                });
            self.reporter
                .lazy_binding_installed(&binding.key, &binding.descriptor);
        }
    }

    fn register_shutdown_task(&self, active: &SharedActive) {
        let active = Rc::clone(active);
        let container = Rc::clone(&self.container);
        let reporter = Rc::clone(&self.reporter);
        self.tasks.register_task(TaskType::PreShutdown, move || {
            let bootstrappers = active.borrow().snapshot();
            reporter.shutdown_starting(bootstrappers.len());
            for (id, handle) in &bootstrappers {
                invoke(id, handle, LifecyclePhase::Shutdown, |bootstrapper| {
                    bootstrapper.shutdown(&container)
                })
                .inspect_err(|error| reporter.dispatch_failed(error))?;
            }
            reporter.shutdown_completed(bootstrappers.len());
            Ok(())
        });
    }
}

impl fmt::Debug for BootstrapperDispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BootstrapperDispatcher")
            .field("container", &self.container)
            .field("tasks", &self.tasks)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

/// Factory installed at a lazily bound key.
struct LazyFactory<R: ?Sized> {
    registry: Rc<R>,
    key: BindingKey,
    descriptor: BootstrapperDescriptor,
    run_registry: Rc<RefCell<RunRegistry>>,
    active: SharedActive,
    reporter: Rc<dyn LifecycleReporter>,
}

impl<R> LazyFactory<R>
where
    R: BootstrapperRegistry + ?Sized,
{
    fn produce(&self, container: &Container) -> Result<Instance, DispatchError> {
        self.bring_up(container)
            .inspect_err(|error| self.reporter.dispatch_failed(error))
    }

    fn bring_up(&self, container: &Container) -> Result<Instance, DispatchError> {
        let scoped = container.scoped(self.descriptor.scope());
        // Must happen first: the bootstrapper rebinds this key.
        scoped.unbind(self.key.clone());

        let id = &self.descriptor.bootstrapper;
        let handle = self.registry.resolve(id)?;
        self.active.borrow_mut().insert(id, &handle);

        if self.run_registry.borrow().contains(id) {
            self.reporter.bootstrapper_reused(id, &self.key);
        } else {
            self.reporter
                .bootstrapper_starting(id, &DispatchTrigger::Lazy(self.key.clone()));
            run_lifecycle(id, &handle, container)?;
            self.run_registry.borrow_mut().record(id.clone());
            self.reporter.bootstrapper_ready(id);
        }

        scoped
            .resolve(self.key.clone())
            .map_err(|source| DispatchError::Resolution {
                key: self.key.clone(),
                source,
            })
    }
}

fn run_lifecycle(
    id: &BootstrapperId,
    handle: &BootstrapperHandle,
    container: &Container,
) -> Result<(), DispatchError> {
    invoke(id, handle, LifecyclePhase::Initialize, |bootstrapper| {
        bootstrapper.initialize()
    })?;
    invoke(id, handle, LifecyclePhase::RegisterBindings, |bootstrapper| {
        bootstrapper.register_bindings(container)
    })?;
    invoke(id, handle, LifecyclePhase::Run, |bootstrapper| {
        bootstrapper.run(container)
    })
}

fn invoke<F>(
    id: &BootstrapperId,
    handle: &BootstrapperHandle,
    phase: LifecyclePhase,
    hook: F,
) -> Result<(), DispatchError>
where
    F: FnOnce(&mut dyn Bootstrapper) -> Result<(), BootstrapperError>,
{
    let mut bootstrapper = handle
        .try_borrow_mut()
        .map_err(|_| DispatchError::Reentrant {
            id: id.clone(),
            phase,
        })?;
    hook(&mut *bootstrapper).map_err(|source| DispatchError::Bootstrapper {
        id: id.clone(),
        phase,
        source,
    })
}

fn validate<R>(
    registry: &R,
    eager: &[BootstrapperId],
    lazy: &LazyBindingTable,
) -> Result<(), RegistryError>
where
    R: BootstrapperRegistry + ?Sized,
{
    let lazy_ids = lazy.bootstrappers();
    for id in eager.iter().chain(&lazy_ids) {
        if id.is_blank() {
            return Err(RegistryError::EmptyIdentifier);
        }
        if !registry.knows(id) {
            return Err(RegistryError::UnknownBootstrapper { id: id.clone() });
        }
    }
    Ok(())
}

/// Eager list as given, then each lazily referenced bootstrapper not
/// already in it, in first-reference order.
fn forced_eager_order(eager: Vec<BootstrapperId>, lazy: &LazyBindingTable) -> Vec<BootstrapperId> {
    let mut order = eager;
    for id in lazy.bootstrappers() {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}

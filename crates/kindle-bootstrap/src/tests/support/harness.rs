//! Dispatcher wired to recording collaborators.

use std::rc::Rc;

use kindle_ioc::{Container, ContainerError};
use kindle_tasks::{TaskDispatcher, TaskError, TaskType};

use crate::dispatcher::{BootstrapperDispatcher, DispatchError};
use crate::registry::BootstrapperRegistry;

use super::journal::Journal;
use super::reporter::RecordingLifecycleReporter;

/// Dispatcher plus the container, task queues, reporter and journal it
/// shares with the bootstrappers under test.
pub struct DispatchHarness {
    pub container: Rc<Container>,
    pub tasks: Rc<TaskDispatcher>,
    pub reporter: Rc<RecordingLifecycleReporter>,
    pub journal: Journal,
    pub dispatcher: BootstrapperDispatcher,
}

impl DispatchHarness {
    #[must_use]
    pub fn new() -> Self {
        let container = Rc::new(Container::new());
        let tasks = Rc::new(TaskDispatcher::new());
        let reporter = Rc::new(RecordingLifecycleReporter::default());
        let dispatcher = BootstrapperDispatcher::with_reporter(
            Rc::clone(&container),
            Rc::clone(&tasks),
            reporter.clone(),
        );
        Self {
            container,
            tasks,
            reporter,
            journal: Journal::default(),
            dispatcher,
        }
    }

    /// Dispatches `registry` through the harness dispatcher.
    pub fn dispatch<R>(&self, registry: &Rc<R>) -> Result<(), DispatchError>
    where
        R: BootstrapperRegistry + ?Sized + 'static,
    {
        self.dispatcher.dispatch(registry)
    }

    /// Resolves `key` globally as a string binding.
    pub fn resolve(&self, key: &str) -> Result<Rc<String>, ContainerError> {
        self.container.resolve_as::<String>(key.to_owned())
    }

    /// Resolves `key` for `target` as a string binding.
    pub fn resolve_for(&self, target: &str, key: &str) -> Result<Rc<String>, ContainerError> {
        self.container
            .for_target(target.to_owned())
            .resolve_as::<String>(key.to_owned())
    }

    /// Runs the queued pre-shutdown tasks.
    pub fn shut_down(&self) -> Result<(), TaskError> {
        self.tasks.dispatch(TaskType::PreShutdown)
    }
}

impl Default for DispatchHarness {
    fn default() -> Self {
        Self::new()
    }
}

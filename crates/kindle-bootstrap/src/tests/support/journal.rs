//! Bootstrapper double that records every hook it executes.

use std::cell::RefCell;
use std::rc::Rc;

use kindle_ioc::{BindingKey, ConsumerId, Container, Scope};

use crate::bootstrapper::{Bootstrapper, BootstrapperError, LifecyclePhase};

/// Ordered log of hook invocations shared by several bootstrappers.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// Copy of every entry, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Entries mentioning `name`, in order.
    #[must_use]
    pub fn entries_for(&self, name: &str) -> Vec<String> {
        let prefix = format!("{name}.");
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Number of times `entry` was recorded.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|recorded| recorded.as_str() == entry)
            .count()
    }
}

#[derive(Debug, Clone)]
struct Provided {
    key: BindingKey,
    scope: Scope,
    value: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{name} failed during {phase}")]
pub struct InjectedFailure {
    pub name: String,
    pub phase: LifecyclePhase,
}

/// Bootstrapper that binds string values and journals each hook as
/// `"<name>.<hook>"`.
#[derive(Debug, Clone)]
pub struct RecordingBootstrapper {
    name: String,
    journal: Journal,
    provides: Vec<Provided>,
    resolves_on_run: Vec<BindingKey>,
    failure: Option<LifecyclePhase>,
}

impl RecordingBootstrapper {
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            provides: Vec::new(),
            resolves_on_run: Vec::new(),
            failure: None,
        }
    }

    /// Binds `key` globally to `value` during `register_bindings`.
    #[must_use]
    pub fn binds(mut self, key: &str, value: &str) -> Self {
        self.provides.push(Provided {
            key: BindingKey::from(key.to_owned()),
            scope: Scope::Global,
            value: value.to_owned(),
        });
        self
    }

    /// Binds `key` for `target` only.
    #[must_use]
    pub fn binds_for(mut self, key: &str, target: &str, value: &str) -> Self {
        self.provides.push(Provided {
            key: BindingKey::from(key.to_owned()),
            scope: Scope::Target(ConsumerId::from(target.to_owned())),
            value: value.to_owned(),
        });
        self
    }

    /// Resolves `key` from the container during `run`.
    #[must_use]
    pub fn resolves_on_run(mut self, key: &str) -> Self {
        self.resolves_on_run.push(BindingKey::from(key.to_owned()));
        self
    }

    /// Makes `phase` return an [`InjectedFailure`].
    #[must_use]
    pub const fn fails_during(mut self, phase: LifecyclePhase) -> Self {
        self.failure = Some(phase);
        self
    }

    fn enter(&self, phase: LifecyclePhase) -> Result<(), BootstrapperError> {
        self.journal.record(format!("{}.{phase}", self.name));
        if self.failure == Some(phase) {
            return Err(InjectedFailure {
                name: self.name.clone(),
                phase,
            }
            .into());
        }
        Ok(())
    }
}

impl Bootstrapper for RecordingBootstrapper {
    fn initialize(&mut self) -> Result<(), BootstrapperError> {
        self.enter(LifecyclePhase::Initialize)
    }

    fn register_bindings(&mut self, container: &Container) -> Result<(), BootstrapperError> {
        self.enter(LifecyclePhase::RegisterBindings)?;
        for provided in &self.provides {
            container
                .scoped(provided.scope.clone())
                .bind_instance(provided.key.clone(), provided.value.clone());
        }
        Ok(())
    }

    fn run(&mut self, container: &Container) -> Result<(), BootstrapperError> {
        self.enter(LifecyclePhase::Run)?;
        for key in &self.resolves_on_run {
            let value = container.resolve_as::<String>(key.clone())?;
            self.journal
                .record(format!("{}.resolved {key}={value}", self.name));
        }
        Ok(())
    }

    fn shutdown(&mut self, container: &Container) -> Result<(), BootstrapperError> {
        let _ = container;
        self.enter(LifecyclePhase::Shutdown)
    }
}

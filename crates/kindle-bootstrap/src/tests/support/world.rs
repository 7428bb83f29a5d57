//! BDD test world: collects bootstrapper declarations, dispatches them, and
//! records what resolution and shutdown produced.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use kindle_ioc::ContainerError;
use rstest::fixture;
use kindle_tasks::TaskError;

use crate::bootstrapper::{BootstrapperId, LifecyclePhase};
use crate::dispatcher::DispatchError;
use crate::registry::{BootstrapperCatalog, DeclaredBinding, RegistryError};

use super::harness::DispatchHarness;
use super::journal::{Journal, RecordingBootstrapper};

#[derive(Debug, Clone)]
struct Declaration {
    name: String,
    lazy_keys: Vec<String>,
    targeted_keys: Vec<(String, String)>,
    resolves_on_run: Vec<String>,
    failure: Option<LifecyclePhase>,
}

impl Declaration {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            lazy_keys: Vec::new(),
            targeted_keys: Vec::new(),
            resolves_on_run: Vec::new(),
            failure: None,
        }
    }

    fn build(&self, journal: &Journal) -> RecordingBootstrapper {
        let mut bootstrapper = RecordingBootstrapper::new(self.name.clone(), journal);
        for key in &self.lazy_keys {
            bootstrapper = bootstrapper.binds(key, &bound_value(&self.name, key));
        }
        for (key, _) in &self.targeted_keys {
            bootstrapper = bootstrapper.binds(key, &bound_value(&self.name, key));
        }
        for key in &self.resolves_on_run {
            bootstrapper = bootstrapper.resolves_on_run(key);
        }
        if let Some(phase) = self.failure {
            bootstrapper = bootstrapper.fails_during(phase);
        }
        bootstrapper
    }

    fn register(&self, catalog: &mut BootstrapperCatalog, journal: &Journal) -> Result<(), RegistryError> {
        let bootstrapper = self.build(journal);
        let id = BootstrapperId::from(self.name.clone());
        if self.lazy_keys.is_empty() && self.targeted_keys.is_empty() {
            catalog.register_eager(id, move || bootstrapper)
        } else {
            let bindings: Vec<DeclaredBinding> = self
                .lazy_keys
                .iter()
                .map(|key| DeclaredBinding::global(key.clone()))
                .chain(self.targeted_keys.iter().map(|(key, target)| {
                    DeclaredBinding::targeted(key.clone(), target.clone())
                }))
                .collect();
            catalog.register_lazy(id, bindings, move || bootstrapper)
        }
    }
}

/// Value a declared bootstrapper binds at `key`.
#[must_use]
pub fn bound_value(name: &str, key: &str) -> String {
    format!("{name}:{key}")
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub harness: DispatchHarness,
    declarations: Vec<Declaration>,
    dispatch_result: Option<Result<(), DispatchError>>,
    resolutions: HashMap<String, Result<Rc<String>, ContainerError>>,
    shutdown_result: Option<Result<(), TaskError>>,
}

impl TestWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            harness: DispatchHarness::new(),
            declarations: Vec::new(),
            dispatch_result: None,
            resolutions: HashMap::new(),
            shutdown_result: None,
        }
    }

    /// Declares an eager bootstrapper.
    pub fn declare_eager(&mut self, name: &str) {
        self.declarations.push(Declaration::new(name));
    }

    /// Declares a lazy bootstrapper supplying each of `keys`.
    pub fn declare_lazy(&mut self, name: &str, keys: &[String]) {
        let mut declaration = Declaration::new(name);
        declaration.lazy_keys = keys.to_vec();
        self.declarations.push(declaration);
    }

    /// Adds a lazy binding of `key` for `target` to the declared
    /// bootstrapper `name`. The bootstrapper still binds `key` globally.
    pub fn supply_for_target(&mut self, name: &str, key: &str, target: &str) -> Result<(), String> {
        self.declaration_mut(name)?
            .targeted_keys
            .push((key.to_owned(), target.to_owned()));
        Ok(())
    }

    /// Makes the declared bootstrapper `name` resolve `key` when it runs.
    pub fn resolve_when_running(&mut self, name: &str, key: &str) -> Result<(), String> {
        self.declaration_mut(name)?
            .resolves_on_run
            .push(key.to_owned());
        Ok(())
    }

    /// Makes the declared bootstrapper `name` fail during `phase`.
    pub fn fail_during(&mut self, name: &str, phase: LifecyclePhase) -> Result<(), String> {
        self.declaration_mut(name)?.failure = Some(phase);
        Ok(())
    }

    pub fn force_eager_loading(&mut self) {
        self.harness.dispatcher.force_eager_loading(true);
    }

    /// Registers every declaration and dispatches the resulting catalog.
    pub fn dispatch(&mut self) -> Result<(), String> {
        let mut catalog = BootstrapperCatalog::new();
        for declaration in &self.declarations {
            declaration
                .register(&mut catalog, &self.harness.journal)
                .map_err(|error| format!("registration failed: {error}"))?;
        }
        self.dispatch_result = Some(self.harness.dispatch(&Rc::new(catalog)));
        Ok(())
    }

    pub fn resolve(&mut self, key: &str) {
        let result = self.harness.resolve(key);
        self.resolutions.insert(key.to_owned(), result);
    }

    /// Resolves `key` on behalf of `target`.
    pub fn resolve_for(&mut self, target: &str, key: &str) {
        let result = self.harness.resolve_for(target, key);
        self.resolutions.insert(key.to_owned(), result);
    }

    pub fn shut_down(&mut self) {
        self.shutdown_result = Some(self.harness.shut_down());
    }

    #[must_use]
    pub const fn dispatch_result(&self) -> Option<&Result<(), DispatchError>> {
        self.dispatch_result.as_ref()
    }

    #[must_use]
    pub fn resolution(&self, key: &str) -> Option<&Result<Rc<String>, ContainerError>> {
        self.resolutions.get(key)
    }

    #[must_use]
    pub const fn shutdown_result(&self) -> Option<&Result<(), TaskError>> {
        self.shutdown_result.as_ref()
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.harness.journal
    }

    fn declaration_mut(&mut self, name: &str) -> Result<&mut Declaration, String> {
        self.declarations
            .iter_mut()
            .find(|declaration| declaration.name == name)
            .ok_or_else(|| format!("bootstrapper {name} was not declared"))
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[fixture]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

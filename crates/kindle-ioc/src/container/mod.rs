//! Scoped binding table with reentrant resolution.
//!
//! The container maps `(Scope, BindingKey)` pairs to either a ready instance
//! or a factory. Factories receive the container itself, so they may bind,
//! unbind and resolve other keys while they run; the binding table is never
//! borrowed across a factory invocation.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{ContainerError, FactoryError};
use crate::key::{BindingKey, ConsumerId, Scope};

const CONTAINER_TARGET: &str = "kindle_ioc::container";

/// Shared value stored in or produced by the container.
pub type Instance = Rc<dyn Any>;

type FactoryFn = Rc<dyn Fn(&Container) -> Result<Instance, FactoryError>>;

#[derive(Clone)]
enum Binding {
    Instance(Instance),
    Factory { factory: FactoryFn, singleton: bool },
}

impl Binding {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Instance(_) => "instance",
            Self::Factory {
                singleton: true, ..
            } => "singleton",
            Self::Factory {
                singleton: false, ..
            } => "factory",
        }
    }
}

/// Inversion-of-control container.
///
/// Operations on the container itself act on [`Scope::Global`]; use
/// [`Container::for_target`] or [`Container::scoped`] to address bindings
/// reserved for one consumer. Targeted resolution falls back to the global
/// binding when the target has none of its own.
#[derive(Default)]
pub struct Container {
    bindings: RefCell<HashMap<(Scope, BindingKey), Binding>>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the container that operates in `scope`.
    #[must_use]
    pub fn scoped(&self, scope: Scope) -> ScopedContainer<'_> {
        ScopedContainer {
            container: self,
            scope,
        }
    }

    /// Returns a view of the container scoped to `target`.
    #[must_use]
    pub fn for_target(&self, target: impl Into<ConsumerId>) -> ScopedContainer<'_> {
        self.scoped(Scope::Target(target.into()))
    }

    /// Binds a ready value at `key`, replacing any previous binding.
    pub fn bind_instance<T: Any>(&self, key: impl Into<BindingKey>, value: T) {
        self.bind_shared(key, Rc::new(value));
    }

    /// Binds an already shared value at `key`.
    pub fn bind_shared(&self, key: impl Into<BindingKey>, value: Instance) {
        self.insert(Scope::Global, key.into(), Binding::Instance(value));
    }

    /// Binds a factory invoked on every resolution of `key`.
    pub fn bind_factory<F>(&self, key: impl Into<BindingKey>, factory: F)
    where
        F: Fn(&Self) -> Result<Instance, FactoryError> + 'static,
    {
        self.insert(Scope::Global, key.into(), factory_binding(factory, false));
    }

    /// Binds a factory whose first result replaces the binding.
    pub fn bind_singleton<F>(&self, key: impl Into<BindingKey>, factory: F)
    where
        F: Fn(&Self) -> Result<Instance, FactoryError> + 'static,
    {
        self.insert(Scope::Global, key.into(), factory_binding(factory, true));
    }

    /// Removes the global binding at `key`, returning whether one existed.
    pub fn unbind(&self, key: impl Into<BindingKey>) -> bool {
        self.remove(&Scope::Global, &key.into())
    }

    /// Reports whether `key` is bound globally.
    #[must_use]
    pub fn has_binding(&self, key: impl Into<BindingKey>) -> bool {
        self.contains(&Scope::Global, &key.into())
    }

    /// Resolves the value bound at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Unbound`] when nothing is bound and
    /// [`ContainerError::Factory`] when the bound factory fails.
    pub fn resolve(&self, key: impl Into<BindingKey>) -> Result<Instance, ContainerError> {
        self.resolve_in(&Scope::Global, &key.into())
    }

    /// Resolves the value bound at `key` and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::TypeMismatch`] when the value is not a `T`,
    /// in addition to the errors of [`Container::resolve`].
    pub fn resolve_as<T: Any>(&self, key: impl Into<BindingKey>) -> Result<Rc<T>, ContainerError> {
        let key = key.into();
        let instance = self.resolve_in(&Scope::Global, &key)?;
        downcast(key, instance)
    }

    /// Resolves the value bound under the conventional key of `T`.
    ///
    /// # Errors
    ///
    /// See [`Container::resolve_as`].
    pub fn resolve_type<T: Any>(&self) -> Result<Rc<T>, ContainerError> {
        self.resolve_as::<T>(BindingKey::of::<T>())
    }

    fn insert(&self, scope: Scope, key: BindingKey, binding: Binding) {
        debug!(
            target: CONTAINER_TARGET,
            key = %key,
            scope = %scope,
            kind = binding.kind(),
            "binding registered"
        );
        self.bindings.borrow_mut().insert((scope, key), binding);
    }

    fn remove(&self, scope: &Scope, key: &BindingKey) -> bool {
        let removed = self
            .bindings
            .borrow_mut()
            .remove(&(scope.clone(), key.clone()))
            .is_some();
        trace!(
            target: CONTAINER_TARGET,
            key = %key,
            scope = %scope,
            removed,
            "binding removed"
        );
        removed
    }

    fn contains(&self, scope: &Scope, key: &BindingKey) -> bool {
        self.bindings
            .borrow()
            .contains_key(&(scope.clone(), key.clone()))
    }

    fn lookup(&self, scope: &Scope, key: &BindingKey) -> Option<(Scope, Binding)> {
        let bindings = self.bindings.borrow();
        let targeted = match scope {
            Scope::Global => None,
            Scope::Target(_) => bindings
                .get(&(scope.clone(), key.clone()))
                .map(|binding| (scope.clone(), binding.clone())),
        };
        targeted.or_else(|| {
            bindings
                .get(&(Scope::Global, key.clone()))
                .map(|binding| (Scope::Global, binding.clone()))
        })
    }

    fn resolve_in(&self, scope: &Scope, key: &BindingKey) -> Result<Instance, ContainerError> {
        let Some((bound_scope, binding)) = self.lookup(scope, key) else {
            return Err(ContainerError::Unbound {
                key: key.clone(),
                scope: scope.clone(),
            });
        };

        match binding {
            Binding::Instance(instance) => Ok(instance),
            Binding::Factory { factory, singleton } => {
                trace!(
                    target: CONTAINER_TARGET,
                    key = %key,
                    scope = %bound_scope,
                    "invoking factory"
                );
                let instance = factory(self).map_err(|source| ContainerError::Factory {
                    key: key.clone(),
                    source,
                })?;
                if singleton {
                    self.insert(
                        bound_scope,
                        key.clone(),
                        Binding::Instance(Rc::clone(&instance)),
                    );
                }
                Ok(instance)
            }
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.borrow();
        let mut keys: Vec<String> = bindings
            .keys()
            .map(|(scope, key)| format!("{scope}:{key}"))
            .collect();
        keys.sort();
        formatter
            .debug_struct("Container")
            .field("bindings", &keys)
            .finish()
    }
}

/// View of a [`Container`] bound to one [`Scope`].
#[derive(Debug, Clone)]
pub struct ScopedContainer<'a> {
    container: &'a Container,
    scope: Scope,
}

impl ScopedContainer<'_> {
    /// Scope this view operates in.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Binds a ready value at `key` in this scope.
    pub fn bind_instance<T: Any>(&self, key: impl Into<BindingKey>, value: T) {
        self.bind_shared(key, Rc::new(value));
    }

    /// Binds an already shared value at `key` in this scope.
    pub fn bind_shared(&self, key: impl Into<BindingKey>, value: Instance) {
        self.container
            .insert(self.scope.clone(), key.into(), Binding::Instance(value));
    }

    /// Binds a factory at `key` in this scope.
    pub fn bind_factory<F>(&self, key: impl Into<BindingKey>, factory: F)
    where
        F: Fn(&Container) -> Result<Instance, FactoryError> + 'static,
    {
        self.container
            .insert(self.scope.clone(), key.into(), factory_binding(factory, false));
    }

    /// Binds a singleton factory at `key` in this scope.
    pub fn bind_singleton<F>(&self, key: impl Into<BindingKey>, factory: F)
    where
        F: Fn(&Container) -> Result<Instance, FactoryError> + 'static,
    {
        self.container
            .insert(self.scope.clone(), key.into(), factory_binding(factory, true));
    }

    /// Removes the binding at `key` in this scope only.
    pub fn unbind(&self, key: impl Into<BindingKey>) -> bool {
        self.container.remove(&self.scope, &key.into())
    }

    /// Reports whether `key` is bound in this scope (ignoring the global
    /// fallback).
    #[must_use]
    pub fn has_binding(&self, key: impl Into<BindingKey>) -> bool {
        self.container.contains(&self.scope, &key.into())
    }

    /// Resolves `key` in this scope, falling back to the global binding.
    ///
    /// # Errors
    ///
    /// See [`Container::resolve`].
    pub fn resolve(&self, key: impl Into<BindingKey>) -> Result<Instance, ContainerError> {
        self.container.resolve_in(&self.scope, &key.into())
    }

    /// Resolves `key` in this scope and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// See [`Container::resolve_as`].
    pub fn resolve_as<T: Any>(&self, key: impl Into<BindingKey>) -> Result<Rc<T>, ContainerError> {
        let key = key.into();
        let instance = self.container.resolve_in(&self.scope, &key)?;
        downcast(key, instance)
    }
}

fn factory_binding<F>(factory: F, singleton: bool) -> Binding
where
    F: Fn(&Container) -> Result<Instance, FactoryError> + 'static,
{
    Binding::Factory {
        factory: Rc::new(factory),
        singleton,
    }
}

fn downcast<T: Any>(key: BindingKey, instance: Instance) -> Result<Rc<T>, ContainerError> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            key,
            expected: type_name::<T>(),
        })
}

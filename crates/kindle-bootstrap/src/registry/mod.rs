//! Bootstrapper registries: which bootstrappers exist and how they are
//! dispatched.
//!
//! A registry answers three questions for the dispatcher: which
//! bootstrappers must run unconditionally, which container keys are supplied
//! lazily (and by whom), and how to obtain the instance behind an
//! identifier. [`BootstrapperCatalog`] is the in-memory implementation.

mod catalog;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use kindle_ioc::{BindingKey, ConsumerId, Scope};

use crate::bootstrapper::{BootstrapperHandle, BootstrapperId};

pub use catalog::{BootstrapperCatalog, BootstrapperConstructors, DeclaredBinding};

/// Source of bootstrappers for a dispatch pass.
pub trait BootstrapperRegistry {
    /// Bootstrappers to initialise unconditionally, in dispatch order.
    fn eager_bootstrappers(&self) -> Vec<BootstrapperId>;

    /// Container keys supplied lazily, with the bootstrapper behind each.
    fn lazy_bootstrapper_bindings(&self) -> LazyBindingTable;

    /// Returns the instance registered under `id`.
    ///
    /// Implementations must return the same instance for every call with the
    /// same identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBootstrapper`] when `id` is not
    /// registered.
    fn resolve(&self, id: &BootstrapperId) -> Result<BootstrapperHandle, RegistryError>;

    /// Whether `id` can be resolved. Registries that cannot answer cheaply
    /// keep the default and let [`BootstrapperRegistry::resolve`] report
    /// unknown identifiers.
    fn knows(&self, id: &BootstrapperId) -> bool {
        let _ = id;
        true
    }
}

/// Identifies the bootstrapper supplying a lazy binding, and the consumer the
/// binding is scoped to (`None` for global bindings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapperDescriptor {
    /// Bootstrapper that registers the real binding.
    pub bootstrapper: BootstrapperId,
    /// Consumer the binding is reserved for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ConsumerId>,
}

impl BootstrapperDescriptor {
    /// Describes a globally scoped binding.
    #[must_use]
    pub fn global(bootstrapper: impl Into<BootstrapperId>) -> Self {
        Self {
            bootstrapper: bootstrapper.into(),
            target: None,
        }
    }

    /// Describes a binding scoped to `target`.
    #[must_use]
    pub fn targeted(
        bootstrapper: impl Into<BootstrapperId>,
        target: impl Into<ConsumerId>,
    ) -> Self {
        Self {
            bootstrapper: bootstrapper.into(),
            target: Some(target.into()),
        }
    }

    /// Container scope the binding lives in.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::from(self.target.clone())
    }
}

/// One entry of a [`LazyBindingTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LazyBinding {
    /// Container key supplied lazily.
    pub key: BindingKey,
    /// Bootstrapper and scope behind the key.
    #[serde(flatten)]
    pub descriptor: BootstrapperDescriptor,
}

/// Insertion-ordered mapping from lazily bound keys to their bootstrappers.
///
/// Each key appears at most once; several keys may name the same
/// bootstrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LazyBindingTable {
    bindings: Vec<LazyBinding>,
}

impl LazyBindingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key → descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyBindingKey`] for blank keys and
    /// [`RegistryError::DuplicateBinding`] when `key` is already present.
    pub fn insert(
        &mut self,
        key: impl Into<BindingKey>,
        descriptor: BootstrapperDescriptor,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if key.as_str().trim().is_empty() {
            return Err(RegistryError::EmptyBindingKey {
                bootstrapper: descriptor.bootstrapper,
            });
        }
        if let Some(existing) = self.get(&key) {
            return Err(RegistryError::DuplicateBinding {
                key,
                existing: existing.bootstrapper.clone(),
                requested: descriptor.bootstrapper,
            });
        }
        self.bindings.push(LazyBinding { key, descriptor });
        Ok(())
    }

    /// Looks up the descriptor for `key`.
    #[must_use]
    pub fn get(&self, key: &BindingKey) -> Option<&BootstrapperDescriptor> {
        self.bindings
            .iter()
            .find(|binding| &binding.key == key)
            .map(|binding| &binding.descriptor)
    }

    /// Iterates the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LazyBinding> {
        self.bindings.iter()
    }

    /// Distinct bootstrappers referenced by the table, in first-reference
    /// order.
    #[must_use]
    pub fn bootstrappers(&self) -> Vec<BootstrapperId> {
        let mut ordered: Vec<BootstrapperId> = Vec::new();
        for binding in &self.bindings {
            if !ordered.contains(&binding.descriptor.bootstrapper) {
                ordered.push(binding.descriptor.bootstrapper.clone());
            }
        }
        ordered
    }

    /// Number of lazily bound keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<'a> IntoIterator for &'a LazyBindingTable {
    type Item = &'a LazyBinding;
    type IntoIter = std::slice::Iter<'a, LazyBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

/// Errors raised while registering or resolving bootstrappers.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No bootstrapper is registered under the identifier.
    #[error("bootstrapper '{id}' is not registered")]
    UnknownBootstrapper {
        /// Identifier that was requested.
        id: BootstrapperId,
    },

    /// A bootstrapper identifier was blank.
    #[error("bootstrapper identifiers must not be blank")]
    EmptyIdentifier,

    /// The identifier was registered twice.
    #[error("bootstrapper '{id}' is already registered")]
    DuplicateBootstrapper {
        /// Identifier registered twice.
        id: BootstrapperId,
    },

    /// A lazy bootstrapper was registered without any bindings, so nothing
    /// could ever trigger it.
    #[error("lazy bootstrapper '{id}' declares no bindings")]
    NoLazyBindings {
        /// Identifier of the bootstrapper.
        id: BootstrapperId,
    },

    /// A lazy binding declared a blank key.
    #[error("bootstrapper '{bootstrapper}' declared a lazy binding with a blank key")]
    EmptyBindingKey {
        /// Bootstrapper that declared the binding.
        bootstrapper: BootstrapperId,
    },

    /// Two bootstrappers claimed the same lazily bound key.
    #[error("lazy binding '{key}' is already supplied by '{existing}', cannot add '{requested}'")]
    DuplicateBinding {
        /// Key claimed twice.
        key: BindingKey,
        /// Bootstrapper already supplying the key.
        existing: BootstrapperId,
        /// Bootstrapper that attempted to claim the key.
        requested: BootstrapperId,
    },
}

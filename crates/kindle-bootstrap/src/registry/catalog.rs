//! In-memory bootstrapper registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use kindle_ioc::{BindingKey, ConsumerId};

use crate::bootstrapper::{Bootstrapper, BootstrapperHandle, BootstrapperId};
use crate::manifest::RegistryManifest;

use super::{BootstrapperDescriptor, BootstrapperRegistry, LazyBindingTable, RegistryError};

const REGISTRY_TARGET: &str = "kindle_bootstrap::registry";

type Constructor = Box<dyn FnOnce() -> BootstrapperHandle>;

enum Entry {
    Pending(Constructor),
    Ready(BootstrapperHandle),
}

/// A container key a lazy bootstrapper promises to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredBinding {
    key: BindingKey,
    target: Option<ConsumerId>,
}

impl DeclaredBinding {
    /// A globally scoped binding at `key`.
    #[must_use]
    pub fn global(key: impl Into<BindingKey>) -> Self {
        Self {
            key: key.into(),
            target: None,
        }
    }

    /// A binding at `key` reserved for `target`.
    #[must_use]
    pub fn targeted(key: impl Into<BindingKey>, target: impl Into<ConsumerId>) -> Self {
        Self {
            key: key.into(),
            target: Some(target.into()),
        }
    }
}

/// Constructors keyed by identifier, used to rebuild a catalog from a
/// [`RegistryManifest`].
#[derive(Default)]
pub struct BootstrapperConstructors {
    constructors: HashMap<BootstrapperId, Constructor>,
}

impl BootstrapperConstructors {
    /// Creates an empty constructor table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the constructor for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyIdentifier`] or
    /// [`RegistryError::DuplicateBootstrapper`].
    pub fn insert<B, F>(
        &mut self,
        id: impl Into<BootstrapperId>,
        constructor: F,
    ) -> Result<(), RegistryError>
    where
        B: Bootstrapper + 'static,
        F: FnOnce() -> B + 'static,
    {
        let id = validate_id(id.into())?;
        if self.constructors.contains_key(&id) {
            return Err(RegistryError::DuplicateBootstrapper { id });
        }
        self.constructors.insert(id, boxed(constructor));
        Ok(())
    }

    /// Number of constructors held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether no constructors are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for BootstrapperConstructors {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self
            .constructors
            .keys()
            .map(BootstrapperId::as_str)
            .collect();
        ids.sort_unstable();
        formatter
            .debug_struct("BootstrapperConstructors")
            .field("ids", &ids)
            .finish()
    }
}

/// Registry built from explicit registrations.
///
/// Bootstrappers are constructed on their first resolution and cached, so an
/// identifier always resolves to the same instance. Lazily registered
/// bootstrappers that are never triggered are never constructed.
#[derive(Default)]
pub struct BootstrapperCatalog {
    entries: RefCell<HashMap<BootstrapperId, Entry>>,
    eager: Vec<BootstrapperId>,
    lazy: LazyBindingTable,
}

impl BootstrapperCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bootstrapper that is initialised on every dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyIdentifier`] or
    /// [`RegistryError::DuplicateBootstrapper`].
    pub fn register_eager<B, F>(
        &mut self,
        id: impl Into<BootstrapperId>,
        constructor: F,
    ) -> Result<(), RegistryError>
    where
        B: Bootstrapper + 'static,
        F: FnOnce() -> B + 'static,
    {
        let id = self.claim(id.into())?;
        debug!(target: REGISTRY_TARGET, bootstrapper = %id, "eager bootstrapper registered");
        self.entries
            .get_mut()
            .insert(id.clone(), Entry::Pending(boxed(constructor)));
        self.eager.push(id);
        Ok(())
    }

    /// Registers a bootstrapper that is initialised the first time one of
    /// `bindings` is resolved.
    ///
    /// The registration is all-or-nothing: when any binding is rejected the
    /// catalog is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoLazyBindings`] when `bindings` is empty,
    /// and the identifier and binding errors of [`LazyBindingTable::insert`].
    pub fn register_lazy<B, F>(
        &mut self,
        id: impl Into<BootstrapperId>,
        bindings: impl IntoIterator<Item = DeclaredBinding>,
        constructor: F,
    ) -> Result<(), RegistryError>
    where
        B: Bootstrapper + 'static,
        F: FnOnce() -> B + 'static,
    {
        let id = self.claim(id.into())?;
        let mut lazy = self.lazy.clone();
        let mut declared = 0_usize;
        for binding in bindings {
            let descriptor = BootstrapperDescriptor {
                bootstrapper: id.clone(),
                target: binding.target,
            };
            lazy.insert(binding.key, descriptor)?;
            declared += 1;
        }
        if declared == 0 {
            return Err(RegistryError::NoLazyBindings { id });
        }
        debug!(
            target: REGISTRY_TARGET,
            bootstrapper = %id,
            bindings = declared,
            "lazy bootstrapper registered"
        );
        self.lazy = lazy;
        self.entries
            .get_mut()
            .insert(id, Entry::Pending(boxed(constructor)));
        Ok(())
    }

    /// Rebuilds a catalog from a stored manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBootstrapper`] when the manifest names
    /// an identifier without a constructor, and the binding errors of
    /// [`LazyBindingTable::insert`] when the manifest's lazy table is
    /// malformed.
    pub fn from_manifest(
        manifest: &RegistryManifest,
        constructors: BootstrapperConstructors,
    ) -> Result<Self, RegistryError> {
        let mut lazy = LazyBindingTable::new();
        for binding in &manifest.lazy {
            lazy.insert(binding.key.clone(), binding.descriptor.clone())?;
        }

        let lazy_ids = lazy.bootstrappers();
        for id in manifest.eager.iter().chain(&lazy_ids) {
            if !constructors.constructors.contains_key(id) {
                return Err(RegistryError::UnknownBootstrapper { id: id.clone() });
            }
        }

        let entries = constructors
            .constructors
            .into_iter()
            .map(|(id, constructor)| (id, Entry::Pending(constructor)))
            .collect();
        debug!(
            target: REGISTRY_TARGET,
            eager = manifest.eager.len(),
            lazy = lazy.len(),
            "catalog rebuilt from manifest"
        );
        Ok(Self {
            entries: RefCell::new(entries),
            eager: manifest.eager.clone(),
            lazy,
        })
    }

    /// Exports the declared eager list and lazy bindings.
    #[must_use]
    pub fn manifest(&self) -> RegistryManifest {
        RegistryManifest {
            eager: self.eager.clone(),
            lazy: self.lazy.clone(),
        }
    }

    /// Whether the bootstrapper behind `id` has been constructed.
    #[must_use]
    pub fn is_instantiated(&self, id: &BootstrapperId) -> bool {
        matches!(self.entries.borrow().get(id), Some(Entry::Ready(_)))
    }

    /// Number of registered bootstrappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn claim(&self, id: BootstrapperId) -> Result<BootstrapperId, RegistryError> {
        let id = validate_id(id)?;
        if self.entries.borrow().contains_key(&id) {
            return Err(RegistryError::DuplicateBootstrapper { id });
        }
        Ok(id)
    }
}

impl BootstrapperRegistry for BootstrapperCatalog {
    fn eager_bootstrappers(&self) -> Vec<BootstrapperId> {
        self.eager.clone()
    }

    fn lazy_bootstrapper_bindings(&self) -> LazyBindingTable {
        self.lazy.clone()
    }

    fn resolve(&self, id: &BootstrapperId) -> Result<BootstrapperHandle, RegistryError> {
        // Detached while the constructor runs.
        let entry = self.entries.borrow_mut().remove(id);
        let handle = match entry {
            None => return Err(RegistryError::UnknownBootstrapper { id: id.clone() }),
            Some(Entry::Ready(handle)) => handle,
            Some(Entry::Pending(constructor)) => {
                debug!(target: REGISTRY_TARGET, bootstrapper = %id, "constructing bootstrapper");
                constructor()
            }
        };
        self.entries
            .borrow_mut()
            .insert(id.clone(), Entry::Ready(Rc::clone(&handle)));
        Ok(handle)
    }

    fn knows(&self, id: &BootstrapperId) -> bool {
        self.entries.borrow().contains_key(id)
    }
}

impl fmt::Debug for BootstrapperCatalog {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BootstrapperCatalog")
            .field("eager", &self.eager)
            .field("lazy", &self.lazy)
            .field("registered", &self.len())
            .finish()
    }
}

fn validate_id(id: BootstrapperId) -> Result<BootstrapperId, RegistryError> {
    if id.is_blank() {
        return Err(RegistryError::EmptyIdentifier);
    }
    Ok(id)
}

fn boxed<B, F>(constructor: F) -> Constructor
where
    B: Bootstrapper + 'static,
    F: FnOnce() -> B + 'static,
{
    Box::new(move || -> BootstrapperHandle { Rc::new(RefCell::new(constructor())) })
}

//! Bookkeeping shared between the dispatch paths and the shutdown task.

use std::collections::HashSet;
use std::rc::Rc;

use crate::bootstrapper::{BootstrapperHandle, BootstrapperId};

/// Identifiers of bootstrappers whose `initialize`, `register_bindings` and
/// `run` hooks all completed. Never reset while the dispatcher lives.
#[derive(Debug, Default)]
pub(crate) struct RunRegistry {
    completed: HashSet<BootstrapperId>,
}

impl RunRegistry {
    /// Marks `id` as run. Returns `false` when it was already recorded.
    pub(crate) fn record(&mut self, id: BootstrapperId) -> bool {
        self.completed.insert(id)
    }

    pub(crate) fn contains(&self, id: &BootstrapperId) -> bool {
        self.completed.contains(id)
    }
}

/// Bootstrapper instances brought to life by one dispatch pass, in the order
/// they became active. An instance appears at most once.
#[derive(Default)]
pub(crate) struct ActiveBootstrappers {
    entries: Vec<(BootstrapperId, BootstrapperHandle)>,
}

impl ActiveBootstrappers {
    /// Appends `handle` unless the same instance is already present.
    pub(crate) fn insert(&mut self, id: &BootstrapperId, handle: &BootstrapperHandle) -> bool {
        if self
            .entries
            .iter()
            .any(|(_, active)| Rc::ptr_eq(active, handle))
        {
            return false;
        }
        self.entries.push((id.clone(), Rc::clone(handle)));
        true
    }

    /// Copies the current list so callers can run hooks without holding a
    /// borrow.
    pub(crate) fn snapshot(&self) -> Vec<(BootstrapperId, BootstrapperHandle)> {
        self.entries.clone()
    }
}

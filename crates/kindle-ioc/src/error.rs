//! Errors raised by container operations.

use thiserror::Error;

use crate::key::{BindingKey, Scope};

/// Error type produced by binding factories.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// Errors arising from container resolution.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No binding exists for the key in the requested scope or globally.
    #[error("no binding registered for '{key}' in {scope} scope")]
    Unbound {
        /// Key that was requested.
        key: BindingKey,
        /// Scope the resolution was attempted in.
        scope: Scope,
    },

    /// The bound value is not of the requested type.
    #[error("binding '{key}' does not hold a value of type {expected}")]
    TypeMismatch {
        /// Key that was requested.
        key: BindingKey,
        /// Name of the type the caller asked for.
        expected: &'static str,
    },

    /// The factory bound at the key failed.
    #[error("factory for '{key}' failed: {source}")]
    Factory {
        /// Key whose factory failed.
        key: BindingKey,
        /// Error reported by the factory.
        #[source]
        source: FactoryError,
    },
}

impl ContainerError {
    /// Key the failing operation targeted.
    #[must_use]
    pub const fn key(&self) -> &BindingKey {
        match self {
            Self::Unbound { key, .. } | Self::TypeMismatch { key, .. } | Self::Factory { key, .. } => {
                key
            }
        }
    }

    /// Attempts to view the factory failure as a concrete error type.
    #[must_use]
    pub fn factory_source<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Factory { source, .. } => source.downcast_ref::<E>(),
            Self::Unbound { .. } | Self::TypeMismatch { .. } => None,
        }
    }
}

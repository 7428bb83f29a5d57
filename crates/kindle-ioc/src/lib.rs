//! Inversion-of-control container for the Kindle application kernel.
//!
//! The container is intentionally small: it stores ready instances and
//! factories under `(Scope, BindingKey)` pairs and resolves them on request.
//! It does not construct types on its own; every value reaches the container
//! through an explicit binding, typically registered by a bootstrapper.
//!
//! Resolution is reentrant. A factory receives the container and may unbind
//! its own key, register new bindings, and resolve further keys before
//! returning, which is what lazily dispatched bootstrappers rely on.

mod container;
mod error;
mod key;

pub use container::{Container, Instance, ScopedContainer};
pub use error::{ContainerError, FactoryError};
pub use key::{BindingKey, ConsumerId, Scope};

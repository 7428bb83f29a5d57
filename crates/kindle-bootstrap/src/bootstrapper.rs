//! The bootstrapper contract and its identifiers.
//!
//! A bootstrapper initialises one module of the application: it prepares its
//! own state, registers bindings in the container, runs any start-up work,
//! and later releases what it acquired. Every hook has a no-op default so a
//! bootstrapper only implements the stages it needs.

use std::any::type_name;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use kindle_ioc::Container;

/// Error type returned by bootstrapper hooks.
pub type BootstrapperError = Box<dyn std::error::Error + Send + Sync>;

/// Shared, mutable handle to a bootstrapper instance.
///
/// The registry hands out the same handle for every resolution of an
/// identifier, so handle identity doubles as instance identity.
pub type BootstrapperHandle = Rc<RefCell<dyn Bootstrapper>>;

/// A unit of module initialisation.
#[cfg_attr(test, mockall::automock)]
pub trait Bootstrapper {
    /// Prepares internal state before any bindings are registered.
    ///
    /// # Errors
    ///
    /// Returns any failure raised by the bootstrapper.
    fn initialize(&mut self) -> Result<(), BootstrapperError> {
        Ok(())
    }

    /// Registers the bootstrapper's bindings in `container`.
    ///
    /// # Errors
    ///
    /// Returns any failure raised by the bootstrapper.
    fn register_bindings(&mut self, container: &Container) -> Result<(), BootstrapperError> {
        let _ = container;
        Ok(())
    }

    /// Performs start-up work once every binding of the pass is registered.
    ///
    /// # Errors
    ///
    /// Returns any failure raised by the bootstrapper.
    fn run(&mut self, container: &Container) -> Result<(), BootstrapperError> {
        let _ = container;
        Ok(())
    }

    /// Releases resources when the application shuts down.
    ///
    /// # Errors
    ///
    /// Returns any failure raised by the bootstrapper.
    fn shutdown(&mut self, container: &Container) -> Result<(), BootstrapperError> {
        let _ = container;
        Ok(())
    }
}

/// Identifier of a bootstrapper within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BootstrapperId(Cow<'static, str>);

impl BootstrapperId {
    /// Builds an identifier from an arbitrary name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Builds the identifier conventionally used for bootstrapper type `B`.
    #[must_use]
    pub fn of<B: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(type_name::<B>()))
    }

    /// Returns the identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BootstrapperId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&'static str> for BootstrapperId {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for BootstrapperId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Lifecycle hook being executed when a bootstrapper fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// [`Bootstrapper::initialize`].
    Initialize,
    /// [`Bootstrapper::register_bindings`].
    RegisterBindings,
    /// [`Bootstrapper::run`].
    Run,
    /// [`Bootstrapper::shutdown`].
    Shutdown,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initialize => "initialize",
            Self::RegisterBindings => "register_bindings",
            Self::Run => "run",
            Self::Shutdown => "shutdown",
        };
        formatter.write_str(label)
    }
}

//! Errors raised while configuring or dispatching events.

use thiserror::Error;

use kindle_ioc::{BindingKey, ContainerError};

/// Error type produced by listeners and subscribers.
pub type ListenerFailure = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the event subsystem.
#[derive(Debug, Error)]
pub enum EventError {
    /// A service listener reference is not of the form `"key@method"`.
    #[error("listener reference '{reference}' must be formatted as \"key@method\"")]
    MalformedListener {
        /// Reference as configured.
        reference: String,
    },
    /// The subscriber behind a service listener could not be resolved.
    #[error("failed to resolve event subscriber '{key}': {source}")]
    Subscriber {
        /// Container key of the subscriber.
        key: BindingKey,
        /// Underlying container error.
        #[source]
        source: ContainerError,
    },
    /// A subscriber does not handle the referenced method.
    #[error("subscriber '{key}' has no handler named '{method}'")]
    UnknownMethod {
        /// Container key of the subscriber.
        key: BindingKey,
        /// Method named by the listener reference.
        method: String,
    },
    /// A listener failed while handling an event.
    #[error("listener for '{event}' failed: {source}")]
    Listener {
        /// Name of the event being dispatched.
        event: String,
        /// Error reported by the listener.
        #[source]
        source: ListenerFailure,
    },
}

impl EventError {
    /// Wraps a listener failure raised while handling `event`.
    #[must_use]
    pub fn listener(event: impl Into<String>, source: impl Into<ListenerFailure>) -> Self {
        Self::Listener {
            event: event.into(),
            source: source.into(),
        }
    }
}

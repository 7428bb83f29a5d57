//! Named-event dispatch for the Kindle application kernel.
//!
//! An [`EventDispatcher`] keeps an ordered list of listeners per event name
//! and invokes them in registration order until one stops the event's
//! propagation. Listeners are either callbacks or `"key@method"` references
//! to an [`EventSubscriber`] bound in the container; the latter are resolved
//! when the event fires, so lazily bound subscribers are only brought up by
//! the first event that needs them.
//!
//! [`EventDispatcherBootstrapper`] wires a dispatcher into the container from
//! a [`ListenerConfigSource`].

mod bootstrapper;
mod dispatcher;
mod error;
mod event;
mod listener;

pub use bootstrapper::{EventDispatcherBootstrapper, ListenerConfigSource};
pub use dispatcher::{EventDispatcher, ListenerContext};
pub use error::{EventError, ListenerFailure};
pub use event::{BasicEvent, Event};
pub use listener::{EventListenerConfig, EventSubscriber, Listener, ListenerConfig};

#[cfg(test)]
mod tests;

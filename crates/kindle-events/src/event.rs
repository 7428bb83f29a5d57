//! Events and propagation control.

use std::any::Any;

/// Something that happened, passed by mutable reference to each listener.
pub trait Event: Any {
    /// Prevents listeners after the current one from seeing the event.
    fn stop_propagation(&mut self);

    /// Whether [`Event::stop_propagation`] has been called.
    fn is_propagation_stopped(&self) -> bool;

    /// Upcast used to recover the concrete event type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable counterpart of [`Event::as_any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Event + '_ {
    /// Views the event as its concrete type.
    #[must_use]
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Mutable counterpart of `downcast_ref`.
    pub fn downcast_mut<T: Event>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Event carrying nothing but its propagation flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicEvent {
    propagation_stopped: bool,
}

impl BasicEvent {
    /// Creates an event that has not been stopped.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            propagation_stopped: false,
        }
    }
}

impl Event for BasicEvent {
    fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

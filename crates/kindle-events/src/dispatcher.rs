//! Listener registry keyed by event name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use kindle_ioc::Container;

use crate::error::EventError;
use crate::event::Event;
use crate::listener::Listener;

const EVENTS_TARGET: &str = "kindle_events";

/// What a listener sees besides the event itself.
#[derive(Clone, Copy)]
pub struct ListenerContext<'a> {
    event_name: &'a str,
    dispatcher: &'a EventDispatcher,
    container: &'a Container,
}

impl<'a> ListenerContext<'a> {
    /// Name the event was dispatched under.
    #[must_use]
    pub const fn event_name(&self) -> &'a str {
        self.event_name
    }

    /// Dispatcher running the listener, for dispatching follow-up events.
    #[must_use]
    pub const fn dispatcher(&self) -> &'a EventDispatcher {
        self.dispatcher
    }

    /// Container the event was dispatched against.
    #[must_use]
    pub const fn container(&self) -> &'a Container {
        self.container
    }
}

impl fmt::Debug for ListenerContext<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ListenerContext")
            .field("event_name", &self.event_name)
            .finish_non_exhaustive()
    }
}

/// Ordered listeners per event name.
///
/// Listeners may register or remove listeners, and dispatch further events,
/// while they run; each dispatch works on the listener list as it was when
/// the dispatch began.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RefCell<HashMap<String, Vec<Listener>>>,
}

impl EventDispatcher {
    /// Creates a dispatcher without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to the listeners of `event_name`.
    pub fn register_listener(&self, event_name: impl Into<String>, listener: Listener) {
        let name = event_name.into();
        let mut listeners = self.listeners.borrow_mut();
        let registered = listeners.entry(name.clone()).or_default();
        registered.push(listener);
        debug!(
            target: EVENTS_TARGET,
            event = %name,
            listeners = registered.len(),
            "listener registered"
        );
    }

    /// Removes `listener` from `event_name`. Listeners are compared by
    /// identity; returns whether one was removed.
    pub fn remove_listener(&self, event_name: &str, listener: &Listener) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(registered) = listeners.get_mut(event_name) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|candidate| !Rc::ptr_eq(candidate, listener));
        let removed = registered.len() != before;
        if registered.is_empty() {
            listeners.remove(event_name);
        }
        removed
    }

    /// Listeners of `event_name`, in registration order.
    #[must_use]
    pub fn listeners(&self, event_name: &str) -> Vec<Listener> {
        self.listeners
            .borrow()
            .get(event_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `event_name` has any listeners.
    #[must_use]
    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.listeners
            .borrow()
            .get(event_name)
            .is_some_and(|registered| !registered.is_empty())
    }

    /// Invokes the listeners of `event_name` in order, stopping once `event`
    /// has its propagation stopped.
    ///
    /// # Errors
    ///
    /// Returns the first listener error; later listeners do not run.
    pub fn dispatch(
        &self,
        container: &Container,
        event_name: &str,
        event: &mut dyn Event,
    ) -> Result<(), EventError> {
        let listeners = self.listeners(event_name);
        let context = ListenerContext {
            event_name,
            dispatcher: self,
            container,
        };
        let mut notified = 0_usize;
        for listener in &listeners {
            if event.is_propagation_stopped() {
                break;
            }
            listener(&mut *event, &context)?;
            notified += 1;
        }
        debug!(
            target: EVENTS_TARGET,
            event = %event_name,
            notified,
            stopped = event.is_propagation_stopped(),
            "event dispatched"
        );
        Ok(())
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut counts: Vec<(&str, usize)> = listeners
            .iter()
            .map(|(name, registered)| (name.as_str(), registered.len()))
            .collect();
        counts.sort_unstable();
        formatter
            .debug_struct("EventDispatcher")
            .field("listeners", &counts)
            .finish()
    }
}

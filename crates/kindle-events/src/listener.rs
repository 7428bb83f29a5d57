//! Listener callbacks and their configuration.

use std::fmt;
use std::rc::Rc;

use kindle_ioc::BindingKey;

use crate::dispatcher::ListenerContext;
use crate::error::EventError;
use crate::event::Event;

/// Callback invoked for a dispatched event.
pub type Listener = Rc<dyn Fn(&mut dyn Event, &ListenerContext<'_>) -> Result<(), EventError>>;

/// Service that handles events through named methods.
///
/// Subscribers are bound in the container as `Rc<dyn EventSubscriber>` and
/// referenced from listener configuration as `"key@method"`.
pub trait EventSubscriber {
    /// Runs the handler called `method`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownMethod`] when the subscriber has no such
    /// handler, or the handler's own failure.
    fn handle(
        &self,
        method: &str,
        event: &mut dyn Event,
        context: &ListenerContext<'_>,
    ) -> Result<(), EventError>;
}

/// How one listener is declared.
#[derive(Clone)]
pub enum ListenerConfig {
    /// A ready callback.
    Callback(Listener),
    /// A `"key@method"` reference to a container-bound [`EventSubscriber`].
    Service(String),
}

impl ListenerConfig {
    /// Declares a callback listener.
    #[must_use]
    pub fn callback<F>(listener: F) -> Self
    where
        F: Fn(&mut dyn Event, &ListenerContext<'_>) -> Result<(), EventError> + 'static,
    {
        Self::Callback(Rc::new(listener))
    }

    /// Declares a subscriber reference such as `"mailer@on_signup"`.
    #[must_use]
    pub fn service(reference: impl Into<String>) -> Self {
        Self::Service(reference.into())
    }

    /// Turns the declaration into a callable listener.
    ///
    /// Service references are validated here but the subscriber itself is
    /// resolved each time the listener fires.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MalformedListener`] when a service reference
    /// lacks the `@` separator or either side of it is blank.
    pub fn into_listener(self) -> Result<Listener, EventError> {
        match self {
            Self::Callback(listener) => Ok(listener),
            Self::Service(reference) => service_listener(reference),
        }
    }
}

impl fmt::Debug for ListenerConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => formatter.write_str("Callback(..)"),
            Self::Service(reference) => formatter.debug_tuple("Service").field(reference).finish(),
        }
    }
}

fn service_listener(reference: String) -> Result<Listener, EventError> {
    let Some((service, handler)) = reference.split_once('@') else {
        return Err(EventError::MalformedListener { reference });
    };
    if service.trim().is_empty() || handler.trim().is_empty() {
        return Err(EventError::MalformedListener { reference });
    }
    let key = BindingKey::from(service.to_owned());
    let method = handler.to_owned();
    let listener: Listener = Rc::new(move |event: &mut dyn Event, context: &ListenerContext<'_>| {
        let subscriber = context
            .container()
            .resolve_as::<Rc<dyn EventSubscriber>>(key.clone())
            .map_err(|source| EventError::Subscriber {
                key: key.clone(),
                source,
            })?;
        subscriber.handle(&method, event, context)
    });
    Ok(listener)
}

/// Listener declarations grouped by event name, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct EventListenerConfig {
    entries: Vec<(String, Vec<ListenerConfig>)>,
}

impl EventListenerConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener` to the listeners of `event_name`.
    #[must_use]
    pub fn listen(mut self, event_name: impl Into<String>, listener: ListenerConfig) -> Self {
        let name = event_name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, listeners)) => listeners.push(listener),
            None => self.entries.push((name, vec![listener])),
        }
        self
    }

    /// Iterates the event names with their listeners.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ListenerConfig])> {
        self.entries
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.as_slice()))
    }

    /// Number of declared listeners across all events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, listeners)| listeners.len()).sum()
    }

    /// Whether nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for EventListenerConfig {
    type Item = (String, Vec<ListenerConfig>);
    type IntoIter = std::vec::IntoIter<(String, Vec<ListenerConfig>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

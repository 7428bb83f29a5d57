//! Bootstrapper that installs an [`EventDispatcher`] in the container.

use tracing::debug;

use kindle_bootstrap::{Bootstrapper, BootstrapperError};
use kindle_ioc::{BindingKey, Container};

use crate::dispatcher::EventDispatcher;
use crate::listener::EventListenerConfig;

const EVENTS_TARGET: &str = "kindle_events";

/// Supplies the listeners an [`EventDispatcherBootstrapper`] registers.
pub trait ListenerConfigSource {
    /// Listener declarations, grouped by event name.
    fn listener_config(&self) -> EventListenerConfig;

    /// Dispatcher the listeners are registered on.
    fn event_dispatcher(&self) -> EventDispatcher {
        EventDispatcher::new()
    }
}

impl<F> ListenerConfigSource for F
where
    F: Fn() -> EventListenerConfig,
{
    fn listener_config(&self) -> EventListenerConfig {
        self()
    }
}

/// Builds a dispatcher from a [`ListenerConfigSource`] and binds it under
/// `BindingKey::of::<EventDispatcher>()`.
#[derive(Debug, Clone)]
pub struct EventDispatcherBootstrapper<C> {
    source: C,
}

impl<C: ListenerConfigSource> EventDispatcherBootstrapper<C> {
    /// Wraps `source`.
    #[must_use]
    pub const fn new(source: C) -> Self {
        Self { source }
    }

    /// Key the dispatcher is bound under.
    #[must_use]
    pub fn binding_key() -> BindingKey {
        BindingKey::of::<EventDispatcher>()
    }
}

impl<C: ListenerConfigSource> Bootstrapper for EventDispatcherBootstrapper<C> {
    fn register_bindings(&mut self, container: &Container) -> Result<(), BootstrapperError> {
        let dispatcher = self.source.event_dispatcher();
        let config = self.source.listener_config();
        let declared = config.len();
        for (event_name, listeners) in config {
            for listener in listeners {
                dispatcher.register_listener(event_name.clone(), listener.into_listener()?);
            }
        }
        debug!(target: EVENTS_TARGET, listeners = declared, "event dispatcher bound");
        container.bind_instance(Self::binding_key(), dispatcher);
        Ok(())
    }
}

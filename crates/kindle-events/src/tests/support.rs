//! Listener and subscriber doubles shared by the event tests.

use std::cell::RefCell;
use std::rc::Rc;

use kindle_ioc::BindingKey;

use crate::{Event, EventError, EventSubscriber, Listener, ListenerContext};

/// Ordered record of listener invocations.
#[derive(Debug, Clone, Default)]
pub struct Log {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Log {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }
}

/// Listener that records `label` each time it fires.
pub fn recording(log: &Log, label: &'static str) -> Listener {
    let sink = log.clone();
    Rc::new(move |_: &mut dyn Event, _: &ListenerContext<'_>| {
        sink.record(label);
        Ok(())
    })
}

/// Subscriber with a `record` handler that logs the event name and a `halt`
/// handler that stops propagation.
pub struct AuditSubscriber {
    log: Log,
}

impl AuditSubscriber {
    /// Subscriber ready to bind in a container.
    pub fn shared(log: &Log) -> Rc<dyn EventSubscriber> {
        Rc::new(Self { log: log.clone() })
    }
}

impl EventSubscriber for AuditSubscriber {
    fn handle(
        &self,
        method: &str,
        event: &mut dyn Event,
        context: &ListenerContext<'_>,
    ) -> Result<(), EventError> {
        match method {
            "record" => {
                self.log.record(format!("audit {}", context.event_name()));
                Ok(())
            }
            "halt" => {
                event.stop_propagation();
                Ok(())
            }
            other => Err(EventError::UnknownMethod {
                key: BindingKey::from("audit"),
                method: other.to_owned(),
            }),
        }
    }
}

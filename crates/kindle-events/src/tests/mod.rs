//! Tests for the kindle-events crate.

mod support;

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;

use kindle_bootstrap::{
    Bootstrapper, BootstrapperCatalog, BootstrapperDispatcher, DeclaredBinding,
};
use kindle_ioc::{BindingKey, Container, ContainerError};
use kindle_tasks::TaskDispatcher;

use crate::{
    BasicEvent, Event, EventDispatcher, EventDispatcherBootstrapper, EventError,
    EventListenerConfig, ListenerConfig,
};
use support::{AuditSubscriber, Log, recording};

#[test]
fn listeners_run_in_registration_order() {
    let log = Log::default();
    let dispatcher = EventDispatcher::new();
    for label in ["first", "second", "third"] {
        dispatcher.register_listener("user.created", recording(&log, label));
    }

    dispatcher
        .dispatch(&Container::new(), "user.created", &mut BasicEvent::new())
        .expect("dispatch");

    assert_eq!(log.entries(), ["first", "second", "third"]);
}

#[test]
fn stopping_propagation_skips_later_listeners() {
    let log = Log::default();
    let dispatcher = EventDispatcher::new();
    dispatcher.register_listener("user.created", recording(&log, "first"));
    dispatcher.register_listener(
        "user.created",
        ListenerConfig::callback(|event, _| {
            event.stop_propagation();
            Ok(())
        })
        .into_listener()
        .expect("callback"),
    );
    dispatcher.register_listener("user.created", recording(&log, "skipped"));
    let mut event = BasicEvent::new();

    dispatcher
        .dispatch(&Container::new(), "user.created", &mut event)
        .expect("dispatch");

    assert_eq!(log.entries(), ["first"]);
    assert!(event.is_propagation_stopped());
}

#[test]
fn events_without_listeners_dispatch_quietly() {
    let dispatcher = EventDispatcher::new();
    assert!(!dispatcher.has_listeners("nothing"));
    assert!(
        dispatcher
            .dispatch(&Container::new(), "nothing", &mut BasicEvent::new())
            .is_ok()
    );
}

#[test]
fn listeners_are_removed_by_identity() {
    let log = Log::default();
    let dispatcher = EventDispatcher::new();
    let kept = recording(&log, "kept");
    let removed = recording(&log, "removed");
    dispatcher.register_listener("user.created", Rc::clone(&kept));
    dispatcher.register_listener("user.created", Rc::clone(&removed));

    assert!(dispatcher.remove_listener("user.created", &removed));
    assert!(!dispatcher.remove_listener("user.created", &removed));
    assert_eq!(dispatcher.listeners("user.created").len(), 1);

    assert!(dispatcher.remove_listener("user.created", &kept));
    assert!(!dispatcher.has_listeners("user.created"));
}

#[test]
fn listeners_added_during_dispatch_wait_for_the_next_event() {
    let log = Log::default();
    let dispatcher = EventDispatcher::new();
    let late = recording(&log, "late");
    dispatcher.register_listener(
        "tick",
        Rc::new(move |_: &mut dyn Event, context: &crate::ListenerContext<'_>| {
            context
                .dispatcher()
                .register_listener("tick", Rc::clone(&late));
            Ok(())
        }),
    );
    let container = Container::new();

    dispatcher
        .dispatch(&container, "tick", &mut BasicEvent::new())
        .expect("first tick");
    assert!(log.entries().is_empty());

    dispatcher
        .dispatch(&container, "tick", &mut BasicEvent::new())
        .expect("second tick");
    assert_eq!(log.entries(), ["late"]);
}

#[test]
fn listener_failures_stop_the_dispatch() {
    let log = Log::default();
    let dispatcher = EventDispatcher::new();
    dispatcher.register_listener(
        "user.created",
        ListenerConfig::callback(|_, context| {
            Err(EventError::listener(context.event_name(), "mailbox full"))
        })
        .into_listener()
        .expect("callback"),
    );
    dispatcher.register_listener("user.created", recording(&log, "after"));

    let error = dispatcher
        .dispatch(&Container::new(), "user.created", &mut BasicEvent::new())
        .expect_err("listener fails");

    assert!(matches!(error, EventError::Listener { ref event, .. } if event == "user.created"));
    assert!(log.entries().is_empty());
}

#[rstest]
#[case("audit")]
#[case("@record")]
#[case("audit@")]
#[case(" @record")]
fn malformed_service_references_are_rejected(#[case] reference: &str) {
    let error = ListenerConfig::service(reference)
        .into_listener()
        .err()
        .expect("malformed reference");
    assert!(matches!(error, EventError::MalformedListener { .. }));
}

#[test]
fn service_listeners_resolve_their_subscriber_when_the_event_fires() {
    let log = Log::default();
    let dispatcher = EventDispatcher::new();
    dispatcher.register_listener(
        "user.created",
        ListenerConfig::service("audit@record")
            .into_listener()
            .expect("service reference"),
    );
    let container = Container::new();
    container.bind_instance("audit", AuditSubscriber::shared(&log));

    dispatcher
        .dispatch(&container, "user.created", &mut BasicEvent::new())
        .expect("dispatch");

    assert_eq!(log.entries(), ["audit user.created"]);
}

#[test]
fn unbound_subscribers_fail_the_dispatch() {
    let dispatcher = EventDispatcher::new();
    dispatcher.register_listener(
        "user.created",
        ListenerConfig::service("audit@record")
            .into_listener()
            .expect("service reference"),
    );

    let error = dispatcher
        .dispatch(&Container::new(), "user.created", &mut BasicEvent::new())
        .expect_err("subscriber is unbound");

    assert!(matches!(
        error,
        EventError::Subscriber {
            source: ContainerError::Unbound { .. },
            ..
        }
    ));
}

#[test]
fn unknown_subscriber_methods_are_reported() {
    let log = Log::default();
    let dispatcher = EventDispatcher::new();
    dispatcher.register_listener(
        "user.created",
        ListenerConfig::service("audit@explode")
            .into_listener()
            .expect("service reference"),
    );
    let container = Container::new();
    container.bind_instance("audit", AuditSubscriber::shared(&log));

    let error = dispatcher
        .dispatch(&container, "user.created", &mut BasicEvent::new())
        .expect_err("no such handler");

    assert!(matches!(error, EventError::UnknownMethod { ref method, .. } if method == "explode"));
}

#[test]
fn bootstrapper_binds_the_configured_dispatcher() {
    let log = Log::default();
    let listener_log = log.clone();
    let mut bootstrapper = EventDispatcherBootstrapper::new(move || {
        EventListenerConfig::new()
            .listen("user.created", ListenerConfig::service("audit@record"))
            .listen(
                "user.created",
                ListenerConfig::Callback(recording(&listener_log, "callback")),
            )
    });
    let container = Container::new();
    container.bind_instance("audit", AuditSubscriber::shared(&log));

    bootstrapper
        .register_bindings(&container)
        .expect("register bindings");
    let dispatcher = container
        .resolve_type::<EventDispatcher>()
        .expect("dispatcher bound");
    dispatcher
        .dispatch(&container, "user.created", &mut BasicEvent::new())
        .expect("dispatch");

    assert_eq!(log.entries(), ["audit user.created", "callback"]);
}

#[test]
fn bootstrapper_rejects_malformed_configuration() {
    let mut bootstrapper = EventDispatcherBootstrapper::new(|| {
        EventListenerConfig::new().listen("user.created", ListenerConfig::service("audit"))
    });
    let container = Container::new();

    let error = bootstrapper
        .register_bindings(&container)
        .expect_err("malformed reference");

    assert!(error.downcast_ref::<EventError>().is_some());
    assert!(!container.has_binding(BindingKey::of::<EventDispatcher>()));
}

#[test]
fn lazily_dispatched_bootstrapper_supplies_the_dispatcher_on_demand() {
    let log = Log::default();
    let listener_log = log.clone();
    let mut catalog = BootstrapperCatalog::new();
    catalog
        .register_lazy(
            "events",
            [DeclaredBinding::global(BindingKey::of::<EventDispatcher>())],
            move || {
                EventDispatcherBootstrapper::new(move || {
                    EventListenerConfig::new().listen(
                        "order.placed",
                        ListenerConfig::Callback(recording(&listener_log, "placed")),
                    )
                })
            },
        )
        .expect("lazy registration");
    let catalog = Rc::new(catalog);
    let container = Rc::new(Container::new());
    let dispatcher =
        BootstrapperDispatcher::new(Rc::clone(&container), Rc::new(TaskDispatcher::new()));

    dispatcher.dispatch(&catalog).expect("dispatch");
    assert!(!catalog.is_instantiated(&"events".into()));

    let events = container
        .resolve_type::<EventDispatcher>()
        .expect("dispatcher supplied lazily");
    events
        .dispatch(&container, "order.placed", &mut BasicEvent::new())
        .expect("event dispatch");

    assert_eq!(log.entries(), ["placed"]);
    assert!(dispatcher.has_run(&"events".into()));
}

#[test]
fn concrete_events_are_recovered_by_downcasting() {
    #[derive(Default)]
    struct OrderPlaced {
        total: u32,
        stopped: bool,
    }

    impl Event for OrderPlaced {
        fn stop_propagation(&mut self) {
            self.stopped = true;
        }

        fn is_propagation_stopped(&self) -> bool {
            self.stopped
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    let dispatcher = EventDispatcher::new();
    dispatcher.register_listener(
        "order.placed",
        ListenerConfig::callback(move |event, _| {
            if let Some(order) = event.downcast_mut::<OrderPlaced>() {
                order.total += 1;
                *sink.borrow_mut() = Some(order.total);
            }
            Ok(())
        })
        .into_listener()
        .expect("callback"),
    );

    let mut order = OrderPlaced {
        total: 41,
        ..OrderPlaced::default()
    };
    dispatcher
        .dispatch(&Container::new(), "order.placed", &mut order)
        .expect("dispatch");

    assert_eq!(*seen.borrow(), Some(42));
}

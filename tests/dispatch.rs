use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tickvisor::{
    Cancellable, Capability, DiagnosticBus, DiagnosticKind, DispatchOrder, Event, EventBus,
    HandlerError, HandlerSet, Listener, LoginResult, LoginResultEvent, ObjectListEvent,
    PluginContainer, RuntimeError,
};

#[derive(Default)]
struct Chat {
    cancelled: bool,
    trail: Vec<String>,
}

impl Cancellable for Chat {
    fn cancelled(&self) -> bool {
        self.cancelled
    }
    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

impl Event for Chat {
    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        Some(self)
    }
    fn as_cancellable_mut(&mut self) -> Option<&mut dyn Cancellable> {
        Some(self)
    }
}

struct Login {
    result: LoginResult,
}

impl LoginResultEvent for Login {
    fn login_result(&self) -> LoginResult {
        self.result
    }
    fn set_login_result(&mut self, result: LoginResult) {
        self.result = result;
    }
}

impl Event for Login {
    fn as_login_result(&self) -> Option<&dyn LoginResultEvent> {
        Some(self)
    }
    fn as_login_result_mut(&mut self) -> Option<&mut dyn LoginResultEvent> {
        Some(self)
    }
}

fn order(v: i32) -> DispatchOrder {
    DispatchOrder::new(v).unwrap()
}

fn trail(label: &'static str) -> impl Fn(&mut Chat) -> Result<(), HandlerError> + Send + Sync {
    move |chat: &mut Chat| {
        chat.trail.push(label.to_string());
        Ok(())
    }
}

#[test]
fn distinct_orders_dispatch_ascending() {
    let bus = EventBus::new(DiagnosticBus::default());
    let p = PluginContainer::new("p");
    for (label, v) in [("h", 100), ("l", -50), ("m", 0), ("lowest", -100), ("hi", 50)] {
        bus.subscribe::<Chat, _>(&p, order(v), false, trail(label));
    }

    let mut chat = Chat::default();
    bus.call(&mut chat);
    assert_eq!(chat.trail, ["lowest", "l", "m", "hi", "h"]);
}

#[test]
fn equal_orders_dispatch_in_registration_order() {
    let bus = EventBus::new(DiagnosticBus::default());
    let a = PluginContainer::new("a");
    let b = PluginContainer::new("b");
    bus.subscribe::<Chat, _>(&a, order(0), false, trail("first"));
    bus.subscribe::<Chat, _>(&b, order(0), false, trail("second"));
    bus.subscribe::<Chat, _>(&a, order(0), false, trail("third"));

    let mut chat = Chat::default();
    bus.call(&mut chat);
    assert_eq!(chat.trail, ["first", "second", "third"]);
}

#[test]
fn cancelled_occurrence_skips_only_non_ignoring_subscribers() {
    let bus = EventBus::new(DiagnosticBus::default());
    let p = PluginContainer::new("p");
    bus.subscribe::<Chat, _>(&p, order(-10), false, |chat| {
        chat.trail.push("canceller".into());
        chat.cancel();
        Ok(())
    });
    bus.subscribe::<Chat, _>(&p, order(0), false, trail("skipped"));
    bus.subscribe::<Chat, _>(&p, order(10), true, trail("monitor"));
    bus.subscribe::<Chat, _>(&p, order(20), false, |chat| {
        chat.trail.push("uncancel".into());
        Ok(())
    });

    let mut chat = Chat::default();
    assert!(bus.call(&mut chat));
    assert_eq!(chat.trail, ["canceller", "monitor"]);
}

#[test]
fn ignoring_subscriber_can_uncancel_for_later_ones() {
    let bus = EventBus::new(DiagnosticBus::default());
    let p = PluginContainer::new("p");
    bus.subscribe::<Chat, _>(&p, order(0), true, |chat| {
        chat.set_cancelled(false);
        Ok(())
    });
    bus.subscribe::<Chat, _>(&p, order(1), false, trail("reached"));

    let mut chat = Chat {
        cancelled: true,
        ..Default::default()
    };
    assert!(!bus.call(&mut chat));
    assert_eq!(chat.trail, ["reached"]);
}

// Listener A (order 0, not ignoring cancelled) cancels; listener B (order 0,
// ignoring cancelled) still runs; the occurrence ends cancelled.
#[test]
fn cancelling_mid_dispatch_skips_later_non_ignoring_subscribers() {
    struct A(Arc<AtomicUsize>);
    impl Listener for A {
        fn handlers(self: Arc<Self>, set: &mut HandlerSet) {
            set.on::<Chat, _>(DispatchOrder::MIDDLE, false, move |chat| {
                self.0.fetch_add(1, Ordering::SeqCst);
                chat.cancel();
                Ok(())
            });
        }
    }

    struct B(Arc<AtomicUsize>);
    impl Listener for B {
        fn handlers(self: Arc<Self>, set: &mut HandlerSet) {
            set.on::<Chat, _>(DispatchOrder::MIDDLE, true, move |_chat| {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
    }

    let bus = EventBus::new(DiagnosticBus::default());
    let p = PluginContainer::new("p");
    let a_calls = Arc::new(AtomicUsize::new(0));
    let b_calls = Arc::new(AtomicUsize::new(0));
    bus.register(&p, Arc::new(A(Arc::clone(&a_calls)))).unwrap();
    bus.register(&p, Arc::new(B(Arc::clone(&b_calls)))).unwrap();

    let mut chat = Chat::default();
    let cancelled = bus.call(&mut chat);

    assert!(cancelled);
    assert!(chat.cancelled);
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn faulting_subscriber_does_not_stop_the_rest() {
    let diagnostics = DiagnosticBus::default();
    let mut rx = diagnostics.subscribe();
    let bus = EventBus::new(diagnostics);
    let good = PluginContainer::new("good");
    let bad = PluginContainer::new("bad");

    bus.subscribe::<Chat, _>(&good, order(-1), false, trail("before"));
    bus.subscribe::<Chat, _>(&bad, order(0), false, |_| Err(HandlerError::fail("broken")));
    bus.subscribe::<Chat, _>(&bad, order(1), false, |_| panic!("exploded"));
    bus.subscribe::<Chat, _>(&good, order(2), false, trail("after"));

    let mut chat = Chat::default();
    assert!(!bus.call(&mut chat));
    assert_eq!(chat.trail, ["before", "after"]);

    let first = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();
    assert_eq!(first.kind, DiagnosticKind::HandlerFaulted);
    assert_eq!(first.owner, Some(bad.id()));
    assert_eq!(first.reason.as_deref(), Some("error: broken"));
    assert_eq!(second.kind, DiagnosticKind::HandlerFaulted);
    assert_eq!(second.reason.as_deref(), Some("panicked: exploded"));
}

#[test]
fn capability_subscribers_see_every_declaring_type() {
    let bus = EventBus::new(DiagnosticBus::default());
    let p = PluginContainer::new("bans");
    bus.subscribe_capability(&p, Capability::LoginResult, order(0), false, |ev| {
        if let Some(login) = ev.as_login_result_mut() {
            login.set_login_result(LoginResult::Kick);
        }
        Ok(())
    });

    let mut login = Login {
        result: LoginResult::Success,
    };
    bus.call(&mut login);
    assert_eq!(login.result, LoginResult::Kick);

    // Chat does not declare LoginResult.
    let mut chat = Chat::default();
    bus.call(&mut chat);
    assert!(chat.trail.is_empty());
}

struct CommandList {
    commands: Vec<String>,
}

impl ObjectListEvent for CommandList {
    type Object = String;

    fn actions(&self) -> &Vec<String> {
        &self.commands
    }
    fn actions_mut(&mut self) -> &mut Vec<String> {
        &mut self.commands
    }
}

impl Event for CommandList {
    fn as_object_list(&self) -> Option<&dyn Any> {
        Some(self.actions())
    }
    fn as_object_list_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self.actions_mut())
    }
}

#[test]
fn object_list_subscribers_extend_and_prune_actions() {
    let bus = EventBus::new(DiagnosticBus::default());
    let p = PluginContainer::new("commands");

    bus.subscribe_capability(&p, Capability::ObjectList, order(-50), false, |ev| {
        if let Some(list) = ev.object_list_mut::<String>() {
            list.push("warp".to_string());
        }
        Ok(())
    });
    bus.subscribe::<CommandList, _>(&p, order(50), false, |cmds| {
        cmds.remove(&"op".to_string());
        cmds.add("home".to_string());
        Ok(())
    });

    let mut cmds = CommandList {
        commands: vec!["op".into(), "help".into()],
    };
    assert!(!bus.call(&mut cmds));
    assert_eq!(cmds.commands, ["help", "warp", "home"]);
}

struct Recorder {
    hits: Mutex<Vec<&'static str>>,
}

impl Listener for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn handlers(self: Arc<Self>, set: &mut HandlerSet) {
        let me = Arc::clone(&self);
        set.on::<Chat, _>(DispatchOrder::LOW, false, move |_| {
            me.hits.lock().push("chat");
            Ok(())
        });
        set.on_all(DispatchOrder::HIGH, true, move |_| {
            self.hits.lock().push("any");
            Ok(())
        });
    }
}

#[test]
fn listener_registration_lifecycle() {
    let diagnostics = DiagnosticBus::default();
    let mut rx = diagnostics.subscribe();
    let bus = EventBus::new(diagnostics);
    let p = PluginContainer::new("p");
    let recorder = Arc::new(Recorder {
        hits: Mutex::new(Vec::new()),
    });

    let id = bus.register(&p, Arc::clone(&recorder)).unwrap();
    assert_eq!(bus.registry().len(), 2);
    assert_eq!(bus.listener_count(), 1);

    let registered = rx.try_recv().unwrap();
    assert_eq!(registered.kind, DiagnosticKind::ListenerRegistered);
    assert_eq!(registered.source.as_deref(), Some("recorder"));

    bus.call(&mut Chat::default());
    assert_eq!(*recorder.hits.lock(), ["chat", "any"]);

    assert_eq!(bus.unregister(id), 2);
    assert_eq!(bus.unregister(id), 0);
    assert!(bus.registry().is_empty());
    assert_eq!(
        rx.try_recv().unwrap().kind,
        DiagnosticKind::ListenerUnregistered
    );

    bus.call(&mut Chat::default());
    assert_eq!(recorder.hits.lock().len(), 2);
}

#[test]
fn same_listener_instance_cannot_register_twice() {
    let bus = EventBus::new(DiagnosticBus::default());
    let p = PluginContainer::new("p");
    let recorder = Arc::new(Recorder {
        hits: Mutex::new(Vec::new()),
    });

    bus.register(&p, Arc::clone(&recorder)).unwrap();
    let err = bus.register(&p, Arc::clone(&recorder)).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::DuplicateRegistration {
            kind: "listener",
            name: "recorder".into(),
        }
    );
    assert_eq!(bus.registry().len(), 2);

    // A distinct instance is fine.
    bus.register(
        &p,
        Arc::new(Recorder {
            hits: Mutex::new(Vec::new()),
        }),
    )
    .unwrap();
    assert_eq!(bus.registry().len(), 4);
}

#[test]
fn unregister_owner_leaves_other_plugins_untouched() {
    let bus = EventBus::new(DiagnosticBus::default());
    let leaving = PluginContainer::new("leaving");
    let staying = PluginContainer::new("staying");

    bus.register(
        &leaving,
        Arc::new(Recorder {
            hits: Mutex::new(Vec::new()),
        }),
    )
    .unwrap();
    bus.subscribe::<Chat, _>(&leaving, order(0), false, trail("leaving"));
    bus.subscribe::<Chat, _>(&staying, order(0), false, trail("staying"));

    assert_eq!(bus.unregister_owner(&leaving), 3);
    assert_eq!(bus.listener_count(), 0);

    let mut chat = Chat::default();
    bus.call(&mut chat);
    assert_eq!(chat.trail, ["staying"]);
}

#[test]
fn concurrent_register_and_unload_keep_listeners_and_handlers_in_step() {
    struct One;
    impl Listener for One {
        fn handlers(self: Arc<Self>, set: &mut HandlerSet) {
            set.on::<Chat, _>(DispatchOrder::MIDDLE, false, |_| Ok(()));
        }
    }

    let bus = Arc::new(EventBus::new(DiagnosticBus::default()));
    let p = PluginContainer::new("churn");

    let registrar = {
        let bus = Arc::clone(&bus);
        let p = p.clone();
        std::thread::spawn(move || {
            for _ in 0..500 {
                bus.register(&p, Arc::new(One)).unwrap();
            }
        })
    };
    let unloader = {
        let bus = Arc::clone(&bus);
        let p = p.clone();
        std::thread::spawn(move || {
            for _ in 0..500 {
                bus.unregister_owner(&p);
                std::thread::yield_now();
            }
        })
    };
    registrar.join().unwrap();
    unloader.join().unwrap();

    // Every surviving listener owns exactly its one handler; nothing is orphaned.
    let listeners = bus.listener_count();
    assert_eq!(bus.registry().len(), listeners);
    assert_eq!(bus.unregister_owner(&p), listeners);
    assert!(bus.registry().is_empty());
}

#[test]
fn subscribers_added_during_dispatch_apply_next_call() {
    let bus = Arc::new(EventBus::new(DiagnosticBus::default()));
    let p = PluginContainer::new("p");

    let inner_bus = Arc::clone(&bus);
    let inner_owner = p.clone();
    let added = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&added);
    bus.subscribe::<Chat, _>(&p, order(0), false, move |chat| {
        chat.trail.push("outer".into());
        if flag.fetch_add(1, Ordering::SeqCst) == 0 {
            inner_bus.subscribe::<Chat, _>(&inner_owner, order(-100), false, trail("inner"));
        }
        Ok(())
    });

    let mut first = Chat::default();
    bus.call(&mut first);
    assert_eq!(first.trail, ["outer"]);

    let mut second = Chat::default();
    bus.call(&mut second);
    assert_eq!(second.trail, ["inner", "outer"]);
}

#[test]
fn dispatch_order_rejects_out_of_range_values() {
    assert_eq!(
        DispatchOrder::new(101),
        Err(RuntimeError::OrderOutOfRange { value: 101 })
    );
    assert!(DispatchOrder::new(-100).is_ok());
}

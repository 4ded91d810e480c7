//! Synchronous publish/subscribe for store mutations.
//!
//! Listeners run on the task that performed the mutation, in registration
//! order, before the mutating call returns. Named listeners are called first,
//! then wildcard listeners with an `{"event", "data"}` envelope. A panicking
//! listener unwinds into the caller. Listeners must not block.

use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::trace;

/// Event name every emitted event is also delivered under.
pub const WILDCARD: &str = "*";
/// Emitted after an activity log entry is added.
pub const ACTIVITY_ADDED: &str = "activity_added";
/// Emitted after the stored metrics snapshot changes.
pub const METRICS_UPDATED: &str = "metrics_updated";
/// Emitted after a successful import.
pub const DATA_IMPORTED: &str = "data_imported";

/// Callback invoked with the event payload.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observer lists keyed by event name.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

impl EventBus {
    /// Creates a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to `event` (or [`WILDCARD`]).
    pub fn on<F>(&self, event: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Unsubscribes the listener `id` from `event`. Returns whether it was registered.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Delivers `data` to the listeners of `event`, then to wildcard listeners.
    pub fn emit(&self, event: &str, data: &Value) {
        // Snapshot under the lock, call outside it: listeners may subscribe or unsubscribe
        let (named, wildcard) = {
            let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            let snapshot = |name: &str| -> Vec<Listener> {
                listeners
                    .get(name)
                    .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
                    .unwrap_or_default()
            };
            (snapshot(event), snapshot(WILDCARD))
        };
        trace!(
            "Emitting '{}' to {} listeners (+{} wildcard)",
            event,
            named.len(),
            wildcard.len()
        );

        for listener in &named {
            listener(data);
        }
        if !wildcard.is_empty() {
            let envelope = json!({ "event": event, "data": data });
            for listener in &wildcard {
                listener(&envelope);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Listener) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for = {
            let log = Arc::clone(&log);
            move |tag: &str| -> Listener {
                let log = Arc::clone(&log);
                let tag = tag.to_string();
                Arc::new(move |value: &Value| {
                    log.lock().unwrap().push(format!("{tag}:{value}"));
                })
            }
        };
        (log, log_for)
    }

    #[test]
    fn test_emit_in_registration_order_then_wildcard() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let first = make("first");
        let second = make("second");
        let any = make("any");
        bus.on("clientes_created", move |v| first(v));
        bus.on("clientes_created", move |v| second(v));
        bus.on(WILDCARD, move |v| any(v));

        bus.emit("clientes_created", &json!({"id": "c1"}));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], r#"first:{"id":"c1"}"#);
        assert_eq!(log[1], r#"second:{"id":"c1"}"#);
        assert_eq!(log[2], r#"any:{"data":{"id":"c1"},"event":"clientes_created"}"#);
    }

    #[test]
    fn test_off_removes_only_that_listener() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let id_a = bus.on("vehiculos_deleted", move |v| a(v));
        bus.on("vehiculos_deleted", move |v| b(v));

        assert!(bus.off("vehiculos_deleted", id_a));
        assert!(!bus.off("vehiculos_deleted", id_a));
        assert!(!bus.off("other_event", id_a));
        assert_eq!(bus.listener_count("vehiculos_deleted"), 1);

        bus.emit("vehiculos_deleted", &json!(1));
        assert_eq!(*log.lock().unwrap(), vec!["b:1".to_string()]);
    }

    #[test]
    fn test_emit_without_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit("servicios_updated", &json!(null));
        assert_eq!(bus.listener_count("servicios_updated"), 0);
    }

    #[test]
    fn test_listener_may_subscribe_during_emit() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.on("x", move |_| {
            inner.on("y", |_| {});
        });
        bus.emit("x", &json!(null));
        assert_eq!(bus.listener_count("y"), 1);
    }

    #[test]
    #[should_panic(expected = "listener failed")]
    #[allow(clippy::panic)]
    fn test_panicking_listener_propagates_to_emitter() {
        let bus = EventBus::new();
        bus.on("clientes_created", |_| panic!("listener failed"));
        bus.emit("clientes_created", &json!({ "id": "c9" }));
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panic_skips_later_listeners_but_keeps_bus_usable() {
        let bus = EventBus::new();
        let (log, log_for) = recorder();
        bus.on("x", |_| panic!("listener failed"));
        let after = log_for("after");
        bus.on("x", move |v| after(v));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bus.emit("x", &json!(1));
        }));
        assert!(result.is_err());
        assert!(log.lock().unwrap().is_empty());

        let y = log_for("y");
        bus.on("y", move |v| y(v));
        bus.emit("y", &json!(2));
        assert_eq!(*log.lock().unwrap(), vec!["y:2".to_string()]);
    }
}

//! In-process event bus used by effect handlers to signal navigation, toasts,
//! modals and data changes to whoever renders the app.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    handler: EventHandler,
    once: bool,
}

/// An emitted event, kept when recording is enabled
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub name: String,
    pub payload: Value,
}

#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<String, Vec<Subscription>>>>,
    history: Option<Arc<Mutex<Vec<EmittedEvent>>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("EventBus")
            .field("events", &handlers)
            .field("recording", &self.history.is_some())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus that also keeps every emitted event for later inspection
    pub fn recording() -> Self {
        Self {
            history: Some(Arc::new(Mutex::new(Vec::new()))),
            ..Self::default()
        }
    }

    fn subscribe(&self, event: &str, handler: EventHandler, once: bool) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        handlers
            .entry(event.to_string())
            .or_default()
            .push(Subscription { id, handler, once });
        id
    }

    pub fn on(&self, event: &str, handler: impl Fn(&Value) + Send + Sync + 'static) -> SubscriptionId {
        self.subscribe(event, Arc::new(handler), false)
    }

    /// Subscribe for the next emission only
    pub fn once(&self, event: &str, handler: impl Fn(&Value) + Send + Sync + 'static) -> SubscriptionId {
        self.subscribe(event, Arc::new(handler), true)
    }

    pub fn off(&self, event: &str, id: SubscriptionId) {
        let mut handlers = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        if let Some(subs) = handlers.get_mut(event) {
            subs.retain(|s| s.id != id);
        }
    }

    /// Notify every handler of `event`.
    ///
    /// Handlers run after the registry lock is released, so a handler may
    /// subscribe or emit without deadlocking.
    pub fn emit(&self, event: &str, payload: Value) {
        tracing::trace!(event, "Emitting event");

        let to_call: Vec<EventHandler> = {
            let mut handlers = self.handlers.write().unwrap_or_else(|p| p.into_inner());
            match handlers.get_mut(event) {
                Some(subs) => {
                    let called = subs.iter().map(|s| s.handler.clone()).collect();
                    subs.retain(|s| !s.once);
                    called
                }
                None => Vec::new(),
            }
        };

        for handler in to_call {
            handler(&payload);
        }

        if let Some(history) = &self.history {
            history
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(EmittedEvent {
                    name: event.to_string(),
                    payload,
                });
        }
    }

    /// Drop handlers of one event, or of all events
    pub fn clear(&self, event: Option<&str>) {
        let mut handlers = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        match event {
            Some(name) => {
                handlers.remove(name);
            }
            None => handlers.clear(),
        }
    }

    /// Recorded events (empty when the bus is not recording)
    pub fn history(&self) -> Vec<EmittedEvent> {
        self.history
            .as_ref()
            .map(|h| h.lock().unwrap_or_else(|p| p.into_inner()).clone())
            .unwrap_or_default()
    }

    /// Recorded events with the given name
    pub fn emitted(&self, event: &str) -> Vec<Value> {
        self.history()
            .into_iter()
            .filter(|e| e.name == event)
            .map(|e| e.payload)
            .collect()
    }
}

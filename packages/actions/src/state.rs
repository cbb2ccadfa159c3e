//! # Execution State
//!
//! Two layers of state are visible to conditions and custom code:
//!
//! - **Shared state**: one bag per running app, handed to the interpreter
//!   explicitly and shared by every workflow invocation
//! - **Context state**: per-invocation values carried in [`ExecutionContext`]
//!
//! Lookups read the context first and fall back to shared state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to the shared state bag.
///
/// Every operation takes the lock for its own duration only, so concurrent
/// workflows writing the same key race (last write wins) but never block one
/// another across an await point.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(values)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        // A panic while holding the lock leaves the map itself intact
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Map<String, Value> {
        self.read().clone()
    }
}

/// Per-invocation context handed to every step of one workflow run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub page_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<Value>,
    #[serde(default)]
    pub state: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            ..Default::default()
        }
    }

    pub fn with_widget(mut self, widget_id: impl Into<String>) -> Self {
        self.widget_id = Some(widget_id.into());
        self
    }

    pub fn with_trigger_data(mut self, data: Value) -> Self {
        self.trigger_data = Some(data);
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }
}

/// Read view combining context state over shared state
pub struct StateScope<'a> {
    context: &'a ExecutionContext,
    shared: &'a SharedState,
}

impl<'a> StateScope<'a> {
    pub fn new(context: &'a ExecutionContext, shared: &'a SharedState) -> Self {
        Self { context, shared }
    }

    /// Context value if present and non-null, else the shared value
    pub fn lookup(&self, field: &str) -> Option<Value> {
        match self.context.state.get(field) {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => self.shared.get(field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_overrides_shared() {
        let shared = SharedState::new();
        shared.set("age", json!(30));
        shared.set("name", json!("Ada"));

        let ctx = ExecutionContext::new("home").with_state("age", json!(17));
        let scope = StateScope::new(&ctx, &shared);

        assert_eq!(scope.lookup("age"), Some(json!(17)));
        assert_eq!(scope.lookup("name"), Some(json!("Ada")));
        assert_eq!(scope.lookup("missing"), None);
    }

    #[test]
    fn test_null_context_value_falls_back() {
        let shared = SharedState::new();
        shared.set("token", json!("abc"));

        let ctx = ExecutionContext::new("home").with_state("token", Value::Null);
        assert_eq!(StateScope::new(&ctx, &shared).lookup("token"), Some(json!("abc")));
    }

    #[test]
    fn test_clones_share_the_same_bag() {
        let shared = SharedState::new();
        let other = shared.clone();
        other.set("k", json!(1));

        assert_eq!(shared.get("k"), Some(json!(1)));
        assert_eq!(shared.remove("k"), Some(json!(1)));
        assert!(other.is_empty());
    }
}

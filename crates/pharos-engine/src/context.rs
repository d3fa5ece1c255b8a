//! The context store — mutable analysis state and its most recent delta.
//!
//! The context is an open-ended mapping of named fields (data model under
//! analysis, interaction history, user/task info). It is created once at
//! engine startup and mutated for the engine's entire lifetime, only through
//! the explicit update operations here — never replaced wholesale.
//!
//! Complex mutations go through a statically registered table of named
//! callbacks (command pattern). A callback's return value *is* the new delta:
//! the engine passes it through opaquely rather than diffing the state.

use std::collections::HashMap;
use std::sync::Arc;

use pharos_core::GuidanceError;
use serde_json::Value;

/// The current analysis state: named fields with arbitrary JSON values.
pub type ContextState = serde_json::Map<String, Value>;

/// The change applied by the most recent update. `Value::Null` until the
/// first update arrives. Exactly one delta is retained engine-wide; each
/// update overwrites it.
pub type Delta = Value;

/// A named state-mutating operation. Receives the state and the caller's
/// parameters; its return value becomes the new delta.
pub type StateCallback = Arc<dyn Fn(&mut ContextState, Value) -> Delta + Send + Sync>;

/// Holds the current application state and dispatches named mutations.
#[derive(Clone, Default)]
pub struct ContextStore {
    state: ContextState,
    callbacks: HashMap<String, StateCallback>,
}

impl ContextStore {
    /// Create an empty context store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an initial state.
    #[must_use]
    pub fn with_state(state: ContextState) -> Self {
        Self {
            state,
            callbacks: HashMap::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> &ContextState {
        &self.state
    }

    /// Mutable access for interaction hooks that update the state.
    pub fn state_mut(&mut self) -> &mut ContextState {
        &mut self.state
    }

    /// Whether any field has been set yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Merge key/value pairs into the state. The applied updates become the
    /// new delta.
    pub fn apply(&mut self, updates: ContextState) -> Delta {
        for (key, value) in updates.clone() {
            let _ = self.state.insert(key, value);
        }
        Value::Object(updates)
    }

    /// Register a named mutation callback. Callbacks are registered once at
    /// startup; re-registering a name replaces the previous callback.
    pub fn register_callback(&mut self, name: impl Into<String>, callback: StateCallback) {
        let _ = self.callbacks.insert(name.into(), callback);
    }

    /// Invoke a registered callback and return its result as the new delta.
    pub fn apply_callback(&mut self, name: &str, params: Value) -> Result<Delta, GuidanceError> {
        let callback = self
            .callbacks
            .get(name)
            .cloned()
            .ok_or_else(|| GuidanceError::UnknownCallback(name.to_owned()))?;
        Ok(callback(&mut self.state, params))
    }
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStore")
            .field("state", &self.state)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn updates(pairs: &[(&str, Value)]) -> ContextState {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn new_store_is_empty() {
        let store = ContextStore::new();
        assert!(store.is_empty());
    }

    #[test]
    fn apply_merges_and_returns_delta() {
        let mut store = ContextStore::new();
        let delta = store.apply(updates(&[("focus", json!("region-a"))]));
        assert_eq!(store.get()["focus"], "region-a");
        assert_eq!(delta["focus"], "region-a");
    }

    #[test]
    fn apply_overwrites_existing_keys() {
        let mut store = ContextStore::new();
        let _ = store.apply(updates(&[("count", json!(1)), ("focus", json!("a"))]));
        let delta = store.apply(updates(&[("count", json!(2))]));
        assert_eq!(store.get()["count"], 2);
        // untouched keys survive
        assert_eq!(store.get()["focus"], "a");
        // the delta only reflects the latest update
        assert!(delta.get("focus").is_none());
    }

    #[test]
    fn callback_return_value_is_the_delta() {
        let mut store = ContextStore::new();
        store.register_callback(
            "bump",
            Arc::new(|state, params| {
                let by = params["by"].as_i64().unwrap_or(1);
                let current = state.get("count").and_then(Value::as_i64).unwrap_or(0);
                let _ = state.insert("count".into(), json!(current + by));
                // opaque delta — not a diff of the state
                json!({ "bumped_by": by })
            }),
        );

        let delta = store.apply_callback("bump", json!({ "by": 3 })).unwrap();
        assert_eq!(store.get()["count"], 3);
        assert_eq!(delta, json!({ "bumped_by": 3 }));
    }

    #[test]
    fn unknown_callback_errors() {
        let mut store = ContextStore::new();
        let err = store.apply_callback("missing", json!({})).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_CALLBACK");
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn reregistering_replaces_callback() {
        let mut store = ContextStore::new();
        store.register_callback("op", Arc::new(|_, _| json!(1)));
        store.register_callback("op", Arc::new(|_, _| json!(2)));
        let delta = store.apply_callback("op", Value::Null).unwrap();
        assert_eq!(delta, json!(2));
    }

    #[test]
    fn with_state_seeds_fields() {
        let store = ContextStore::with_state(updates(&[("user", json!("analyst"))]));
        assert!(!store.is_empty());
        assert_eq!(store.get()["user"], "analyst");
    }

    #[test]
    fn state_mut_allows_hook_updates() {
        let mut store = ContextStore::new();
        let _ = store.state_mut().insert("accepted".into(), json!(true));
        assert_eq!(store.get()["accepted"], true);
    }
}

//! Guidance strategies — top-level rule units.
//!
//! A strategy decides whether it is applicable in the current context and
//! contributes the conditional actions it can generate. Strategies are
//! registered once at engine startup; their applicability is recomputed on
//! the slow tick, not their identity.

use pharos_core::Degree;
use serde_json::Value;

use crate::action::ActionHandle;
use crate::context::{ContextState, Delta};

/// Identity and classification of a strategy.
#[derive(Clone, Debug, Default)]
pub struct StrategyMetadata {
    /// Human-readable strategy name.
    pub name: String,
    /// Optional stable ID; used as the wire `strategy` field when present.
    pub strategy_id: Option<String>,
    /// Guidance degree this strategy operates at.
    pub degree: Degree,
    /// The visualization component this strategy targets.
    pub component: String,
    /// Free-form additional metadata.
    pub extra: serde_json::Map<String, Value>,
}

impl StrategyMetadata {
    /// Create metadata with the given name and degree.
    #[must_use]
    pub fn new(name: impl Into<String>, degree: Degree) -> Self {
        Self {
            name: name.into(),
            degree,
            ..Self::default()
        }
    }

    /// The identifier written into generated suggestions: the strategy ID if
    /// defined, otherwise the name.
    #[must_use]
    pub fn wire_id(&self) -> &str {
        self.strategy_id.as_deref().unwrap_or(&self.name)
    }
}

/// A top-level rule unit.
pub trait Strategy: Send + Sync {
    /// Strategy identity and classification.
    fn metadata(&self) -> &StrategyMetadata;

    /// Pure applicability predicate over (context, delta). Repeated calls
    /// with unchanged inputs must return the same result.
    fn is_applicable(&self, _context: &ContextState, _delta: &Delta) -> bool {
        true
    }

    /// The action set this strategy contributes.
    ///
    /// Returning clones of stored `Arc`s preserves action identity (and the
    /// open-suggestion flag) across regeneration cycles; constructing fresh
    /// instances per call intentionally resets open-suggestion tracking.
    fn generate_actions(&self) -> Vec<ActionHandle>;
}

type ApplicabilityFn = Box<dyn Fn(&ContextState, &Delta) -> bool + Send + Sync>;

/// A strategy with a preconfigured action list and an optional applicability
/// closure (default: always applicable).
pub struct StaticStrategy {
    metadata: StrategyMetadata,
    actions: Vec<ActionHandle>,
    applicable_when: Option<ApplicabilityFn>,
}

impl StaticStrategy {
    /// Create a strategy with no actions yet.
    #[must_use]
    pub fn new(metadata: StrategyMetadata) -> Self {
        Self {
            metadata,
            actions: Vec::new(),
            applicable_when: None,
        }
    }

    /// Add an action to the contributed set.
    #[must_use]
    pub fn with_action(mut self, action: ActionHandle) -> Self {
        self.actions.push(action);
        self
    }

    /// Override the applicability predicate.
    #[must_use]
    pub fn applicable_when(
        mut self,
        predicate: impl Fn(&ContextState, &Delta) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.applicable_when = Some(Box::new(predicate));
        self
    }
}

impl Strategy for StaticStrategy {
    fn metadata(&self) -> &StrategyMetadata {
        &self.metadata
    }

    fn is_applicable(&self, context: &ContextState, delta: &Delta) -> bool {
        match &self.applicable_when {
            Some(predicate) => predicate(context, delta),
            None => true,
        }
    }

    fn generate_actions(&self) -> Vec<ActionHandle> {
        self.actions.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionMetadata, FnAction};
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn meta() -> StrategyMetadata {
        StrategyMetadata::new("coverage-gap", Degree::Directing)
    }

    #[test]
    fn wire_id_prefers_strategy_id() {
        let mut m = meta();
        assert_eq!(m.wire_id(), "coverage-gap");
        m.strategy_id = Some("strat-7".into());
        assert_eq!(m.wire_id(), "strat-7");
    }

    #[test]
    fn default_applicability_is_true() {
        let strategy = StaticStrategy::new(meta());
        assert!(strategy.is_applicable(&Map::new(), &Value::Null));
    }

    #[test]
    fn applicability_closure_sees_context_and_delta() {
        let strategy = StaticStrategy::new(meta())
            .applicable_when(|ctx, delta| ctx.contains_key("focus") && !delta.is_null());
        assert!(!strategy.is_applicable(&Map::new(), &Value::Null));

        let mut ctx = Map::new();
        let _ = ctx.insert("focus".into(), json!("a"));
        assert!(!strategy.is_applicable(&ctx, &Value::Null));
        assert!(strategy.is_applicable(&ctx, &json!({"focus": "a"})));
    }

    #[test]
    fn generate_actions_returns_stored_instances() {
        let action = Arc::new(FnAction::new(
            ActionMetadata::new("act-1", Degree::Directing),
            meta(),
            |_, _| true,
        ));
        let strategy = StaticStrategy::new(meta()).with_action(action.clone());

        let first = strategy.generate_actions();
        let second = strategy.generate_actions();
        assert_eq!(first.len(), 1);
        // identity persists across regeneration cycles
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }

    #[test]
    fn applicability_is_idempotent() {
        let strategy =
            StaticStrategy::new(meta()).applicable_when(|ctx, _| ctx.contains_key("focus"));
        let ctx = Map::new();
        let delta = Value::Null;
        let first = strategy.is_applicable(&ctx, &delta);
        for _ in 0..5 {
            assert_eq!(strategy.is_applicable(&ctx, &delta), first);
        }
    }
}

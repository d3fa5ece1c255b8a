//! Meta-strategy — the cross-strategy arbitration seam.
//!
//! After applicable strategies have contributed their actions, the engine
//! hands the union to the configured meta-strategy, which may reorder,
//! deduplicate, or drop actions before they are evaluated. The default
//! passes everything through unchanged.

use crate::action::ActionHandle;
use crate::context::ContextState;

/// Arbitration over the pooled action set of all applicable strategies.
pub trait MetaStrategy: Send + Sync {
    /// Filter or reorder the pooled actions. The returned handles become the
    /// engine's active action set until the next regeneration.
    fn filter(&self, actions: Vec<ActionHandle>, context: &ContextState) -> Vec<ActionHandle>;
}

/// The default meta-strategy: keeps every action in contribution order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl MetaStrategy for Passthrough {
    fn filter(&self, actions: Vec<ActionHandle>, _context: &ContextState) -> Vec<ActionHandle> {
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionMetadata, ConditionalAction, FnAction};
    use crate::strategy::StrategyMetadata;
    use pharos_core::Degree;
    use serde_json::Map;
    use std::sync::Arc;

    fn handle(id: &str) -> ActionHandle {
        Arc::new(FnAction::new(
            ActionMetadata::new(id, Degree::Orienting),
            StrategyMetadata::new("s", Degree::Orienting),
            |_, _| true,
        ))
    }

    #[test]
    fn passthrough_preserves_order_and_count() {
        let pool = vec![handle("a"), handle("b"), handle("c")];
        let filtered = Passthrough.filter(pool.clone(), &Map::new());
        assert_eq!(filtered.len(), 3);
        for (kept, original) in filtered.iter().zip(&pool) {
            assert!(Arc::ptr_eq(kept, original));
        }
    }

    #[test]
    fn custom_meta_strategy_can_drop_actions() {
        struct OrientingOnly;
        impl MetaStrategy for OrientingOnly {
            fn filter(
                &self,
                actions: Vec<ActionHandle>,
                _context: &ContextState,
            ) -> Vec<ActionHandle> {
                actions
                    .into_iter()
                    .filter(|a| a.metadata().degree == Degree::Orienting)
                    .collect()
            }
        }

        let directing = Arc::new(FnAction::new(
            ActionMetadata::new("d", Degree::Directing),
            StrategyMetadata::new("s", Degree::Directing),
            |_, _| true,
        ));
        let pool: Vec<ActionHandle> = vec![handle("a"), directing];
        let filtered = OrientingOnly.filter(pool, &Map::new());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].metadata().action_id.as_str(), "a");
    }
}

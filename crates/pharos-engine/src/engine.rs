//! The guidance engine — orchestrator over strategies, actions, and the live
//! suggestion list.
//!
//! The engine is the sole authority on suggestion identity: it pairs every
//! live envelope with the action that produced it, decides retraction, and
//! routes observer interactions to the owning action's hooks. It is a plain
//! synchronous state machine; scheduling and concurrency live in
//! [`crate::service`].

use std::sync::Arc;

use pharos_core::{Envelope, GuidanceError, Interaction, SuggestionId};
use serde_json::Value;

use crate::action::ActionHandle;
use crate::context::{ContextState, ContextStore, Delta, StateCallback};
use crate::meta::MetaStrategy;
use crate::strategy::Strategy;

/// A live envelope paired with the action that produced it. The pairing stays
/// engine-internal; only the envelope is ever serialized.
struct LiveSuggestion {
    envelope: Envelope,
    action: ActionHandle,
}

/// Orchestrates strategy evaluation, suggestion generation, retraction, and
/// observer interactions over a single context store.
pub struct GuidanceEngine {
    strategies: Vec<Arc<dyn Strategy>>,
    meta: Arc<dyn MetaStrategy>,
    applicable: Vec<Arc<dyn Strategy>>,
    actions: Vec<ActionHandle>,
    live: Vec<LiveSuggestion>,
    context: ContextStore,
    last_delta: Delta,
}

impl GuidanceEngine {
    /// Create an engine over the given strategies and context.
    ///
    /// All strategies start applicable; the action set is regenerated
    /// immediately so suggestions can be produced before the first slow tick.
    #[must_use]
    pub fn new(
        strategies: Vec<Arc<dyn Strategy>>,
        meta: Arc<dyn MetaStrategy>,
        context: ContextStore,
    ) -> Self {
        let mut engine = Self {
            applicable: strategies.clone(),
            strategies,
            meta,
            actions: Vec::new(),
            live: Vec::new(),
            context,
            last_delta: Value::Null,
        };
        engine.regenerate_actions();
        engine
    }

    /// Current context state.
    #[must_use]
    pub fn context(&self) -> &ContextState {
        self.context.get()
    }

    /// The delta applied by the most recent update.
    #[must_use]
    pub fn last_delta(&self) -> &Delta {
        &self.last_delta
    }

    /// Register a named state callback on the underlying context store.
    pub fn register_callback(&mut self, name: impl Into<String>, callback: StateCallback) {
        self.context.register_callback(name, callback);
    }

    /// Merge key/value updates into the context and record them as the delta.
    pub fn apply_update(&mut self, updates: ContextState) -> Delta {
        let delta = self.context.apply(updates);
        self.last_delta = delta.clone();
        delta
    }

    /// Invoke a named state callback; its return value becomes the delta.
    ///
    /// # Errors
    ///
    /// [`GuidanceError::UnknownCallback`] if no callback is registered under
    /// the name.
    pub fn apply_callback(&mut self, name: &str, params: Value) -> Result<Delta, GuidanceError> {
        let delta = self.context.apply_callback(name, params)?;
        self.last_delta = delta.clone();
        Ok(delta)
    }

    /// Recompute which strategies are applicable and rebuild the action set.
    ///
    /// Skipped entirely while the context is empty: before the first state
    /// update there is nothing to evaluate against, and the initial
    /// all-applicable set stays in place.
    pub fn evaluate_strategies(&mut self) {
        if self.context.is_empty() {
            tracing::debug!("skipping strategy evaluation, context is empty");
            return;
        }
        self.applicable = self
            .strategies
            .iter()
            .filter(|s| s.is_applicable(self.context.get(), &self.last_delta))
            .cloned()
            .collect();
        tracing::debug!(
            applicable = self.applicable.len(),
            total = self.strategies.len(),
            "strategy applicability refreshed"
        );
        self.regenerate_actions();
    }

    /// Pool the applicable strategies' actions and run them through the
    /// meta-strategy. Live suggestions are untouched; actions keep their
    /// identity across regeneration because strategies hand out the same
    /// handles each time.
    fn regenerate_actions(&mut self) {
        let pool: Vec<ActionHandle> = self
            .applicable
            .iter()
            .flat_map(|s| s.generate_actions())
            .collect();
        self.actions = self.meta.filter(pool, self.context.get());
    }

    /// Withdraw live suggestions whose actions vote to retract.
    ///
    /// For each withdrawn suggestion the open-suggestion flag is cleared
    /// first, then the retract hook runs, so the hook observes the action as
    /// eligible again. Returns the retract envelopes in live-list order.
    pub fn suggestions_to_retract(&mut self) -> Vec<Envelope> {
        let delta = self.last_delta.clone();
        let live = std::mem::take(&mut self.live);
        let mut retracted = Vec::new();
        for entry in live {
            if entry
                .action
                .should_retract(self.context.get(), &delta, &entry.envelope)
            {
                entry.action.suggested().clear();
                entry
                    .action
                    .on_retract(self.context.state_mut(), &delta, &entry.envelope);
                tracing::debug!(suggestion_id = %entry.envelope.id(), "suggestion retracted");
                retracted.push(entry.envelope.with_interaction(Interaction::Retract));
            } else {
                self.live.push(entry);
            }
        }
        retracted
    }

    /// Evaluate every active action and collect fresh `make` envelopes.
    ///
    /// An action with a live suggestion is skipped; at most one suggestion
    /// per action is in flight.
    pub fn generate_suggestions(&mut self) -> Vec<Envelope> {
        let mut made = Vec::new();
        let actions = self.actions.clone();
        for action in actions {
            if !action.is_applicable(self.context.get(), &self.last_delta) {
                continue;
            }
            if let Some(envelope) = action.generate(self.context.get()) {
                tracing::debug!(
                    suggestion_id = %envelope.id(),
                    action_id = %envelope.suggestion.event.action_id,
                    "suggestion made"
                );
                made.push(envelope.clone());
                self.live.push(LiveSuggestion { envelope, action });
            }
        }
        made
    }

    /// Apply an observer interaction to a live suggestion.
    ///
    /// Terminal interactions (`accept`, `reject`) remove the envelope from
    /// the live list without clearing the open-suggestion flag, so the action
    /// does not immediately re-offer the same suggestion. Previews keep the
    /// envelope live and re-tag it. Returns the re-tagged envelope.
    ///
    /// # Errors
    ///
    /// [`GuidanceError::SuggestionNotFound`] if no live suggestion has the
    /// ID, and [`GuidanceError::UnsupportedInteraction`] for `make` and
    /// `retract` (engine-only interactions) or previews the owning action
    /// does not implement.
    pub fn interact(
        &mut self,
        id: &SuggestionId,
        interaction: Interaction,
    ) -> Result<Envelope, GuidanceError> {
        let index = self
            .live
            .iter()
            .position(|entry| entry.envelope.id() == id)
            .ok_or_else(|| GuidanceError::SuggestionNotFound(id.clone()))?;
        let delta = self.last_delta.clone();

        match interaction {
            Interaction::Accept => {
                let entry = self.live.remove(index);
                entry
                    .action
                    .on_accept(self.context.state_mut(), &delta, &entry.envelope);
                Ok(entry.envelope.with_interaction(Interaction::Accept))
            }
            Interaction::Reject => {
                let entry = self.live.remove(index);
                entry
                    .action
                    .on_reject(self.context.state_mut(), &delta, &entry.envelope);
                Ok(entry.envelope.with_interaction(Interaction::Reject))
            }
            Interaction::PreviewStart | Interaction::PreviewEnd => {
                let action = Arc::clone(&self.live[index].action);
                let envelope = self.live[index].envelope.clone();
                if interaction == Interaction::PreviewStart {
                    action.preview_start(self.context.state_mut(), &delta, &envelope)?;
                } else {
                    action.preview_end(self.context.state_mut(), &delta, &envelope)?;
                }
                let retagged = envelope.with_interaction(interaction);
                self.live[index].envelope = retagged.clone();
                Ok(retagged)
            }
            // make and retract originate inside the engine
            Interaction::Make | Interaction::Retract => {
                Err(GuidanceError::UnsupportedInteraction {
                    interaction,
                    action_id: self.live[index].envelope.suggestion.event.action_id.clone(),
                })
            }
        }
    }

    /// Snapshot of the live envelope list.
    #[must_use]
    pub fn suggestions(&self) -> Vec<Envelope> {
        self.live.iter().map(|entry| entry.envelope.clone()).collect()
    }
}

impl std::fmt::Debug for GuidanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidanceEngine")
            .field("strategies", &self.strategies.len())
            .field("applicable", &self.applicable.len())
            .field("actions", &self.actions.len())
            .field("live", &self.live.len())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

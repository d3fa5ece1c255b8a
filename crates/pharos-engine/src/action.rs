//! Conditional actions — the per-suggestion rule units.
//!
//! An action pairs a condition over (context, delta) with content generation
//! and a set of lifecycle hooks. Actions carry an open-suggestion flag: while
//! a suggestion generated by an action is live, the action is held back from
//! generating another one. The flag is cleared only on retraction; accept and
//! reject leave it set, so an accepted or rejected suggestion is not
//! immediately re-offered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pharos_core::{
    ActionId, Degree, Envelope, GuidanceError, Suggestion, SuggestionEvent, SuggestionId,
};
use serde_json::Value;
use thiserror::Error;

use crate::context::{ContextState, Delta};
use crate::strategy::StrategyMetadata;

/// Identity and classification of a conditional action.
#[derive(Clone, Debug, Default)]
pub struct ActionMetadata {
    /// Author-assigned ID; observers route suggestions to UI components by it.
    pub action_id: ActionId,
    /// Guidance degree stamped onto generated suggestions.
    pub degree: Degree,
    /// Free-form additional metadata.
    pub extra: serde_json::Map<String, Value>,
}

impl ActionMetadata {
    /// Create metadata with the given ID and degree.
    #[must_use]
    pub fn new(action_id: impl Into<ActionId>, degree: Degree) -> Self {
        Self {
            action_id: action_id.into(),
            degree,
            extra: serde_json::Map::new(),
        }
    }
}

/// Tracks whether an action currently has a live suggestion.
///
/// Interior mutability lets the engine hold actions behind shared handles
/// while still flipping the flag during evaluation.
#[derive(Debug, Default)]
pub struct SuggestedFlag(AtomicBool);

impl SuggestedFlag {
    /// Whether a suggestion from this action is currently live.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the action as having a live suggestion.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag, making the action eligible to generate again.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Generated suggestion content: the payload value plus its explanation text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SuggestionContent {
    /// The suggested value; any JSON-serializable structure.
    pub value: Value,
    /// Short explanation shown with the suggestion.
    pub title: String,
    /// Longer explanation shown with the suggestion.
    pub description: String,
}

impl SuggestionContent {
    /// Content with a value and explanation text.
    #[must_use]
    pub fn new(value: Value, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Content generation failure. A failing action yields no suggestion this
/// cycle; the engine logs and moves on.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A context field the generator needs is absent.
    #[error("missing context field '{0}'")]
    MissingField(String),
    /// Any other generation failure.
    #[error("{0}")]
    Other(String),
}

/// Shared handle to a conditional action.
///
/// Strategies hand out clones of the same `Arc` across regeneration cycles so
/// the open-suggestion flag survives.
pub type ActionHandle = Arc<dyn ConditionalAction>;

/// A rule unit owning condition, content generation, and lifecycle hooks.
///
/// Every hook has a default: the trait is implemented by overriding only what
/// an action needs. Previews default to unsupported, which surfaces to
/// callers as a not-implemented error.
pub trait ConditionalAction: Send + Sync {
    /// Action identity and classification.
    fn metadata(&self) -> &ActionMetadata;

    /// Metadata of the strategy that contributed this action.
    fn strategy(&self) -> &StrategyMetadata;

    /// The open-suggestion flag.
    fn suggested(&self) -> &SuggestedFlag;

    /// Whether the action fires for the current (context, delta).
    fn condition(&self, context: &ContextState, delta: &Delta) -> bool;

    /// Fires only when the condition holds *and* no suggestion from this
    /// action is currently live.
    fn is_applicable(&self, context: &ContextState, delta: &Delta) -> bool {
        !self.suggested().is_set() && self.condition(context, delta)
    }

    /// Produce the suggestion content for the current context.
    fn generate_content(&self, _context: &ContextState) -> Result<SuggestionContent, ContentError> {
        Ok(SuggestionContent::default())
    }

    /// Build a fresh `make` envelope and set the open-suggestion flag.
    ///
    /// Returns `None` when content generation fails; the failure is logged
    /// and the action stays eligible for the next cycle.
    fn generate(&self, context: &ContextState) -> Option<Envelope> {
        let content = match self.generate_content(context) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    action_id = %self.metadata().action_id,
                    error = %err,
                    "suggestion content generation failed"
                );
                return None;
            }
        };

        let suggestion = Suggestion {
            id: SuggestionId::new(),
            title: content.title,
            description: content.description,
            degree: self.metadata().degree,
            strategy: self.strategy().wire_id().to_owned(),
            event: SuggestionEvent {
                action_id: self.metadata().action_id.clone(),
                value: content.value,
            },
        };

        self.suggested().set();
        Some(Envelope::make(suggestion))
    }

    /// Whether a live suggestion from this action should be withdrawn.
    fn should_retract(&self, _context: &ContextState, _delta: &Delta, _live: &Envelope) -> bool {
        false
    }

    /// Hook invoked when the engine retracts a live suggestion.
    fn on_retract(&self, _context: &mut ContextState, _delta: &Delta, _live: &Envelope) {}

    /// Hook invoked when an observer accepts a suggestion.
    fn on_accept(&self, _context: &mut ContextState, _delta: &Delta, _live: &Envelope) {}

    /// Hook invoked when an observer rejects a suggestion.
    fn on_reject(&self, _context: &mut ContextState, _delta: &Delta, _live: &Envelope) {}

    /// Hook invoked when an observer starts previewing a suggestion.
    ///
    /// # Errors
    ///
    /// Defaults to [`GuidanceError::UnsupportedInteraction`].
    fn preview_start(
        &self,
        _context: &mut ContextState,
        _delta: &Delta,
        live: &Envelope,
    ) -> Result<(), GuidanceError> {
        Err(GuidanceError::UnsupportedInteraction {
            interaction: pharos_core::Interaction::PreviewStart,
            action_id: live.suggestion.event.action_id.clone(),
        })
    }

    /// Hook invoked when an observer stops previewing a suggestion.
    ///
    /// # Errors
    ///
    /// Defaults to [`GuidanceError::UnsupportedInteraction`].
    fn preview_end(
        &self,
        _context: &mut ContextState,
        _delta: &Delta,
        live: &Envelope,
    ) -> Result<(), GuidanceError> {
        Err(GuidanceError::UnsupportedInteraction {
            interaction: pharos_core::Interaction::PreviewEnd,
            action_id: live.suggestion.event.action_id.clone(),
        })
    }
}

type ConditionFn = Box<dyn Fn(&ContextState, &Delta) -> bool + Send + Sync>;
type ContentFn = Box<dyn Fn(&ContextState) -> Result<SuggestionContent, ContentError> + Send + Sync>;
type RetractFn = Box<dyn Fn(&ContextState, &Delta, &Envelope) -> bool + Send + Sync>;
type HookFn = Box<dyn Fn(&mut ContextState, &Delta, &Envelope) + Send + Sync>;

/// A conditional action assembled from closures.
///
/// The usual way to define actions without writing a struct per rule; each
/// builder overrides one lifecycle hook.
pub struct FnAction {
    metadata: ActionMetadata,
    strategy: StrategyMetadata,
    suggested: SuggestedFlag,
    condition: ConditionFn,
    content: Option<ContentFn>,
    retract_when: Option<RetractFn>,
    on_accept: Option<HookFn>,
    on_reject: Option<HookFn>,
    on_retract: Option<HookFn>,
    on_preview_start: Option<HookFn>,
    on_preview_end: Option<HookFn>,
}

impl FnAction {
    /// Create an action with a condition and default hooks.
    #[must_use]
    pub fn new(
        metadata: ActionMetadata,
        strategy: StrategyMetadata,
        condition: impl Fn(&ContextState, &Delta) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            metadata,
            strategy,
            suggested: SuggestedFlag::default(),
            condition: Box::new(condition),
            content: None,
            retract_when: None,
            on_accept: None,
            on_reject: None,
            on_retract: None,
            on_preview_start: None,
            on_preview_end: None,
        }
    }

    /// Set the content generator.
    #[must_use]
    pub fn with_content(
        mut self,
        content: impl Fn(&ContextState) -> Result<SuggestionContent, ContentError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.content = Some(Box::new(content));
        self
    }

    /// Set the retraction predicate over live suggestions.
    #[must_use]
    pub fn with_retraction(
        mut self,
        retract_when: impl Fn(&ContextState, &Delta, &Envelope) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retract_when = Some(Box::new(retract_when));
        self
    }

    /// Set the accept hook.
    #[must_use]
    pub fn with_on_accept(
        mut self,
        hook: impl Fn(&mut ContextState, &Delta, &Envelope) + Send + Sync + 'static,
    ) -> Self {
        self.on_accept = Some(Box::new(hook));
        self
    }

    /// Set the reject hook.
    #[must_use]
    pub fn with_on_reject(
        mut self,
        hook: impl Fn(&mut ContextState, &Delta, &Envelope) + Send + Sync + 'static,
    ) -> Self {
        self.on_reject = Some(Box::new(hook));
        self
    }

    /// Set the retract hook.
    #[must_use]
    pub fn with_on_retract(
        mut self,
        hook: impl Fn(&mut ContextState, &Delta, &Envelope) + Send + Sync + 'static,
    ) -> Self {
        self.on_retract = Some(Box::new(hook));
        self
    }

    /// Enable preview support with start and end hooks.
    #[must_use]
    pub fn with_preview(
        mut self,
        on_start: impl Fn(&mut ContextState, &Delta, &Envelope) + Send + Sync + 'static,
        on_end: impl Fn(&mut ContextState, &Delta, &Envelope) + Send + Sync + 'static,
    ) -> Self {
        self.on_preview_start = Some(Box::new(on_start));
        self.on_preview_end = Some(Box::new(on_end));
        self
    }
}

impl ConditionalAction for FnAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    fn strategy(&self) -> &StrategyMetadata {
        &self.strategy
    }

    fn suggested(&self) -> &SuggestedFlag {
        &self.suggested
    }

    fn condition(&self, context: &ContextState, delta: &Delta) -> bool {
        (self.condition)(context, delta)
    }

    fn generate_content(&self, context: &ContextState) -> Result<SuggestionContent, ContentError> {
        match &self.content {
            Some(content) => content(context),
            None => Ok(SuggestionContent::default()),
        }
    }

    fn should_retract(&self, context: &ContextState, delta: &Delta, live: &Envelope) -> bool {
        match &self.retract_when {
            Some(retract_when) => retract_when(context, delta, live),
            None => false,
        }
    }

    fn on_retract(&self, context: &mut ContextState, delta: &Delta, live: &Envelope) {
        if let Some(hook) = &self.on_retract {
            hook(context, delta, live);
        }
    }

    fn on_accept(&self, context: &mut ContextState, delta: &Delta, live: &Envelope) {
        if let Some(hook) = &self.on_accept {
            hook(context, delta, live);
        }
    }

    fn on_reject(&self, context: &mut ContextState, delta: &Delta, live: &Envelope) {
        if let Some(hook) = &self.on_reject {
            hook(context, delta, live);
        }
    }

    fn preview_start(
        &self,
        context: &mut ContextState,
        delta: &Delta,
        live: &Envelope,
    ) -> Result<(), GuidanceError> {
        match &self.on_preview_start {
            Some(hook) => {
                hook(context, delta, live);
                Ok(())
            }
            None => Err(GuidanceError::UnsupportedInteraction {
                interaction: pharos_core::Interaction::PreviewStart,
                action_id: self.metadata.action_id.clone(),
            }),
        }
    }

    fn preview_end(
        &self,
        context: &mut ContextState,
        delta: &Delta,
        live: &Envelope,
    ) -> Result<(), GuidanceError> {
        match &self.on_preview_end {
            Some(hook) => {
                hook(context, delta, live);
                Ok(())
            }
            None => Err(GuidanceError::UnsupportedInteraction {
                interaction: pharos_core::Interaction::PreviewEnd,
                action_id: self.metadata.action_id.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for FnAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAction")
            .field("metadata", &self.metadata)
            .field("strategy", &self.strategy.name)
            .field("suggested", &self.suggested)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

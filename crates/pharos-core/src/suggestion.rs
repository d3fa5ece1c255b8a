//! The suggestion wire model.
//!
//! A [`Suggestion`] is immutable once created. It is wrapped in an
//! [`Envelope`] carrying the interaction tag that tracks the suggestion's
//! lifecycle. Envelopes are what the engine transmits to observers and
//! tracks in its live list; the owning-action back-reference is deliberately
//! *not* part of the envelope, so it can never leak into a serialized
//! payload — the engine pairs envelopes with action handles on its own side.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::degree::Degree;
use crate::ids::{ActionId, SuggestionId};

/// The actual suggested value, routed to UI components by `action_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionEvent {
    /// The action that produced this suggestion. Observers use this to
    /// decide which visualization component the suggestion belongs to.
    pub action_id: ActionId,
    /// The suggested value; any JSON-serializable structure.
    pub value: serde_json::Value,
}

/// An immutable guidance suggestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Globally unique ID, assigned at generation time.
    pub id: SuggestionId,
    /// Short text explaining or justifying the suggestion.
    pub title: String,
    /// Longer text explaining or justifying the suggestion.
    pub description: String,
    /// The guidance degree with which the suggestion should be visualized.
    pub degree: Degree,
    /// The ID (if defined, otherwise the name) of the generating strategy.
    pub strategy: String,
    /// The suggested content payload.
    pub event: SuggestionEvent,
}

/// The interaction performed on a suggestion.
///
/// The engine `make`s and `retract`s suggestions; observers `accept`,
/// `reject` or `preview` them. `Accept`, `Reject` and `Retract` are terminal:
/// once applied the envelope leaves the engine's live list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interaction {
    /// A new suggestion was generated.
    #[serde(rename = "make")]
    Make,
    /// The observer accepted the suggestion (terminal).
    #[serde(rename = "accept")]
    Accept,
    /// The observer rejected the suggestion (terminal).
    #[serde(rename = "reject")]
    Reject,
    /// The observer started previewing the suggestion.
    #[serde(rename = "preview start")]
    PreviewStart,
    /// The observer stopped previewing the suggestion.
    #[serde(rename = "preview end")]
    PreviewEnd,
    /// The engine withdrew the suggestion (terminal).
    #[serde(rename = "retract")]
    Retract,
}

impl Interaction {
    /// Whether this interaction removes the envelope from the live list.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accept | Self::Reject | Self::Retract)
    }

    /// Wire representation of the interaction.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Make => "make",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::PreviewStart => "preview start",
            Self::PreviewEnd => "preview end",
            Self::Retract => "retract",
        }
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope payload type. Currently only `guidance` exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// A guidance suggestion.
    #[default]
    Guidance,
}

/// The unit transmitted to observers and tracked by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The suggestion itself.
    pub suggestion: Suggestion,
    /// Payload type tag.
    #[serde(rename = "type", default)]
    pub kind: EnvelopeKind,
    /// The most recent interaction performed on the suggestion.
    pub interaction: Interaction,
}

impl Envelope {
    /// Wrap a freshly generated suggestion with `interaction = make`.
    #[must_use]
    pub fn make(suggestion: Suggestion) -> Self {
        Self {
            suggestion,
            kind: EnvelopeKind::Guidance,
            interaction: Interaction::Make,
        }
    }

    /// The wrapped suggestion's ID.
    #[must_use]
    pub fn id(&self) -> &SuggestionId {
        &self.suggestion.id
    }

    /// Copy of this envelope re-tagged with another interaction.
    #[must_use]
    pub fn with_interaction(&self, interaction: Interaction) -> Self {
        Self {
            interaction,
            ..self.clone()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

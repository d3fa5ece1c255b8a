//! Guidance error types.
//!
//! Typed error hierarchy for the engine and its control surface. Each error
//! carries a stable machine-readable code so callers never have to match on
//! message strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ActionId, SuggestionId};
use crate::suggestion::Interaction;

/// Errors surfaced by the guidance engine and its control endpoints.
#[derive(Clone, Debug, Error)]
pub enum GuidanceError {
    /// No live suggestion with the given ID. Terminal interactions remove
    /// envelopes from the live list, so this also covers "already accepted".
    #[error("suggestion not found: {0}")]
    SuggestionNotFound(SuggestionId),

    /// The owning action does not implement the requested interaction.
    /// Distinct from [`GuidanceError::SuggestionNotFound`] so integration
    /// gaps surface early instead of silently no-opping.
    #[error("action {action_id} does not support '{interaction}'")]
    UnsupportedInteraction {
        /// The interaction that was requested.
        interaction: Interaction,
        /// The action that rejected it.
        action_id: ActionId,
    },

    /// No state callback registered under the given name.
    #[error("unknown state callback: {0}")]
    UnknownCallback(String),

    /// A control call arrived before an engine was configured.
    #[error("guidance engine is not configured")]
    NotConfigured,

    /// `start` was called while the periodic tasks were already running.
    #[error("guidance engine is already running")]
    AlreadyRunning,

    /// `stop` was called while no periodic tasks were running.
    #[error("guidance engine is not running")]
    NotRunning,
}

impl GuidanceError {
    /// Stable machine-readable code for the error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SuggestionNotFound(_) => "NOT_FOUND",
            Self::UnsupportedInteraction { .. } => "NOT_IMPLEMENTED",
            Self::UnknownCallback(_) => "UNKNOWN_CALLBACK",
            Self::NotConfigured => "NOT_CONFIGURED",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::NotRunning => "NOT_RUNNING",
        }
    }
}

/// Wire-format error body. Boundary errors are reported as a message plus
/// code, never a stack trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub error: String,
}

impl From<&GuidanceError> for ErrorBody {
    fn from(err: &GuidanceError) -> Self {
        Self {
            code: err.code().to_owned(),
            error: err.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

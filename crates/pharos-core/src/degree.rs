//! Guidance degree classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The strength with which a suggestion is intended to be surfaced.
///
/// Orienting guidance hints at options, directing guidance recommends one,
/// prescribing guidance applies it outright (subject to user interaction).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Degree {
    /// Broadens the user's view of the option space.
    #[default]
    Orienting,
    /// Recommends a specific option.
    Directing,
    /// Applies an option, pending user confirmation.
    Prescribing,
}

impl Degree {
    /// Wire representation of the degree.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orienting => "orienting",
            Self::Directing => "directing",
            Self::Prescribing => "prescribing",
        }
    }
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

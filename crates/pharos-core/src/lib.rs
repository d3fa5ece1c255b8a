//! # pharos-core
//!
//! Foundation types for the Pharos guidance engine.
//!
//! This crate provides the shared vocabulary that the engine and server
//! crates depend on:
//!
//! - **Branded IDs**: [`SuggestionId`], [`ActionId`], [`ClientId`] as
//!   newtypes for type safety
//! - **Degree**: guidance strength classification
//! - **Suggestion wire model**: [`Suggestion`], [`Envelope`],
//!   [`Interaction`] — the units transmitted to observers
//! - **Errors**: [`GuidanceError`] hierarchy via `thiserror` with stable
//!   machine-readable codes
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod degree;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod suggestion;

pub use degree::Degree;
pub use errors::{ErrorBody, GuidanceError};
pub use ids::{ActionId, ClientId, SuggestionId};
pub use suggestion::{Envelope, EnvelopeKind, Interaction, Suggestion, SuggestionEvent};

//! # pharos-engine
//!
//! The evaluation-and-lifecycle core of the Pharos guidance engine:
//!
//! - **Context store**: the mutable analysis state plus a statically
//!   registered table of named mutation callbacks
//! - **Strategies and conditional actions**: polymorphic rule units with
//!   default lifecycle hooks
//! - **Guidance engine**: the orchestrator owning the live suggestion list
//!   and the sole authority on suggestion identity and retraction
//! - **Guidance service**: the dual-interval scheduler driving re-evaluation
//!   and publishing envelopes to the broadcast channel

#![deny(unsafe_code)]

pub mod action;
pub mod context;
pub mod engine;
pub mod meta;
pub mod service;
pub mod strategy;

pub use action::{
    ActionHandle, ActionMetadata, ConditionalAction, ContentError, FnAction, SuggestedFlag,
    SuggestionContent,
};
pub use context::{ContextState, ContextStore, Delta, StateCallback};
pub use engine::GuidanceEngine;
pub use meta::{MetaStrategy, Passthrough};
pub use service::{GuidanceService, TickConfig};
pub use strategy::{StaticStrategy, Strategy, StrategyMetadata};

//! # pharos-server
//!
//! The network surface of the Pharos guidance engine: an axum HTTP server
//! exposing the control endpoints (engine start/stop, state updates,
//! suggestion interactions) plus WebSocket fan-out of guidance envelopes to
//! connected observers at `/channels/{client_id}`.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod websocket;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, GuidanceServer};

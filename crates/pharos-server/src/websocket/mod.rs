//! WebSocket connection management, envelope fan-out, and the engine-to-client
//! bridge.

pub mod bridge;
pub mod broadcast;
pub mod connection;
pub mod socket;

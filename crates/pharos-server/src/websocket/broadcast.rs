//! Envelope fan-out to connected observers.

use std::collections::HashMap;
use std::sync::Arc;

use pharos_core::{ClientId, Envelope};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Manages envelope broadcasting to connected observers. Every observer
/// receives every envelope; there is no per-client routing.
pub struct BroadcastManager {
    connections: RwLock<HashMap<ClientId, Arc<ClientConnection>>>,
}

impl BroadcastManager {
    /// Create a new broadcast manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection. A reconnect under the same client ID replaces the
    /// previous connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, client_id: &ClientId) {
        let mut conns = self.connections.write().await;
        let _ = conns.remove(client_id);
    }

    /// Broadcast an envelope to all connected observers.
    pub async fn broadcast(&self, envelope: &Envelope) {
        let json = match serde_json::to_string(envelope) {
            Ok(j) => j,
            Err(e) => {
                warn!(suggestion_id = %envelope.id(), error = %e, "failed to serialize envelope");
                return;
            }
        };
        let conns = self.connections.read().await;
        debug!(
            interaction = %envelope.interaction,
            suggestion_id = %envelope.id(),
            recipients = conns.len(),
            "broadcast envelope"
        );
        for conn in conns.values() {
            if !conn.send(json.clone()) {
                warn!(client_id = %conn.id, "failed to send envelope to observer");
            }
        }
    }

    /// Number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

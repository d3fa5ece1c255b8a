//! Event bridge — forwards envelopes from the guidance service's broadcast
//! channel to WebSocket observers.

use std::sync::Arc;

use pharos_core::Envelope;
use tokio::sync::broadcast;

use super::broadcast::BroadcastManager;

/// Bridges engine envelopes to WebSocket observers.
pub struct EventBridge {
    rx: broadcast::Receiver<Envelope>,
    broadcast: Arc<BroadcastManager>,
}

impl EventBridge {
    /// Create a new event bridge.
    #[must_use]
    pub fn new(rx: broadcast::Receiver<Envelope>, broadcast: Arc<BroadcastManager>) -> Self {
        Self { rx, broadcast }
    }

    /// Run the bridge loop. Exits when the service's sender is dropped.
    #[tracing::instrument(skip_all, name = "event_bridge")]
    pub async fn run(mut self) {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => {
                    tracing::debug!(
                        interaction = %envelope.interaction,
                        suggestion_id = %envelope.id(),
                        "bridging envelope to observers"
                    );
                    self.broadcast.broadcast(&envelope).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event bridge lagged, envelopes skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event bridge: sender closed, exiting");
                    break;
                }
            }
        }
    }
}

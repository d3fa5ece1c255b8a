//! Server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the guidance server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `8000`).
    pub port: u16,
    /// Per-client outbound queue size. When an observer falls this far
    /// behind, further envelopes to it are dropped rather than stalling the
    /// evaluation loops.
    pub client_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            client_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Bind address string (`host:port`).
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//! `GuidanceServer` — axum HTTP + WebSocket server around a guidance service.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use pharos_core::GuidanceError;
use pharos_engine::GuidanceService;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::routes;
use crate::websocket::bridge::EventBridge;
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::socket;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The guidance service, once one has been configured.
    pub service: Option<Arc<GuidanceService>>,
    /// Broadcast manager for envelope fan-out.
    pub broadcast: Arc<BroadcastManager>,
    /// When the server started.
    pub start_time: Instant,
    /// Per-client outbound queue size.
    pub client_buffer: usize,
}

impl AppState {
    /// The configured guidance service.
    ///
    /// # Errors
    ///
    /// [`GuidanceError::NotConfigured`] when no service has been wired yet.
    pub fn guidance(&self) -> Result<&Arc<GuidanceService>, ApiError> {
        self.service
            .as_ref()
            .ok_or(ApiError(GuidanceError::NotConfigured))
    }
}

/// The guidance HTTP/WebSocket server.
pub struct GuidanceServer {
    config: ServerConfig,
    service: Option<Arc<GuidanceService>>,
    broadcast: Arc<BroadcastManager>,
    start_time: Instant,
}

impl GuidanceServer {
    /// Create a server without a guidance service. Control endpoints answer
    /// `NOT_CONFIGURED`; health and WebSocket channels work.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            service: None,
            broadcast: Arc::new(BroadcastManager::new()),
            start_time: Instant::now(),
        }
    }

    /// Create a server wired to a guidance service.
    #[must_use]
    pub fn with_service(config: ServerConfig, service: Arc<GuidanceService>) -> Self {
        Self {
            service: Some(service),
            ..Self::new(config)
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            broadcast: self.broadcast.clone(),
            start_time: self.start_time,
            client_buffer: self.config.client_buffer,
        };

        Router::new()
            .route("/health", get(routes::health))
            .route("/start", get(routes::start_engine))
            .route("/stop", get(routes::stop_engine))
            .route("/suggestions", get(routes::list_suggestions))
            .route("/state/update", post(routes::update_state))
            .route(
                "/state/update_with_callback",
                post(routes::update_with_callback),
            )
            .route("/accept", post(routes::accept_suggestion))
            .route("/reject", post(routes::reject_suggestion))
            .route("/preview_start", post(routes::preview_start))
            .route("/preview_end", post(routes::preview_end))
            .route("/channels/{client_id}", get(socket::channel_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Spawn the bridge forwarding service envelopes to WebSocket observers.
    /// Returns `None` when no service is configured. The task exits when the
    /// service is dropped.
    pub fn spawn_bridge(&self) -> Option<JoinHandle<()>> {
        let service = self.service.as_ref()?;
        let bridge = EventBridge::new(service.subscribe(), self.broadcast.clone());
        Some(tokio::spawn(bridge.run()))
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the broadcast manager.
    #[must_use]
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.broadcast
    }

    /// Get the guidance service, if configured.
    #[must_use]
    pub fn service(&self) -> Option<&Arc<GuidanceService>> {
        self.service.as_ref()
    }
}

//! HTTP control endpoints.
//!
//! The REST surface mirrors what observers need around the WebSocket stream:
//! engine start/stop, a snapshot of live suggestions (for page refreshes),
//! state vector updates, and the suggestion interactions.

use axum::extract::State;
use axum::response::Json;
use pharos_core::{Envelope, Interaction, SuggestionId};
use pharos_engine::{ContextState, Delta};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::server::AppState;

/// GET /health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server answers.
    pub status: String,
    /// Seconds since server start.
    pub uptime_secs: u64,
    /// Active WebSocket observer connections.
    pub connections: usize,
    /// Whether the evaluation loops are running.
    pub running: bool,
    /// Number of live suggestions.
    pub suggestions: usize,
}

/// Engine run-state reported by `/start` and `/stop`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Whether the evaluation loops are running after the call.
    pub running: bool,
}

fn default_true() -> bool {
    true
}

/// POST /state/update body.
#[derive(Debug, Deserialize)]
pub struct StateVectorUpdate {
    /// Key-value pairs merged into the state vector.
    pub updates: ContextState,
    /// Re-evaluate all actions immediately instead of waiting for the next
    /// scheduled tick.
    #[serde(default = "default_true")]
    pub re_evaluate_actions: bool,
    /// Re-evaluate strategy applicability immediately.
    #[serde(default)]
    pub re_evaluate_strategies: bool,
}

/// POST /state/update_with_callback body.
#[derive(Debug, Deserialize)]
pub struct CallbackUpdate {
    /// Name of the registered state callback to invoke.
    pub callback: String,
    /// Parameters passed to the callback.
    #[serde(default)]
    pub params: Value,
    /// Re-evaluate all actions immediately.
    #[serde(default = "default_true")]
    pub re_evaluate_actions: bool,
    /// Re-evaluate strategy applicability immediately.
    #[serde(default)]
    pub re_evaluate_strategies: bool,
}

/// Body of the interaction endpoints: the ID of the targeted suggestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct InteractionRequest {
    /// Live suggestion ID.
    pub id: SuggestionId,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (running, suggestions) = match &state.service {
        Some(service) => (service.is_running(), service.suggestions().await.len()),
        None => (false, 0),
    };
    Json(HealthResponse {
        status: "ok".into(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        connections: state.broadcast.connection_count().await,
        running,
        suggestions,
    })
}

/// GET /start — begin periodic evaluation.
pub async fn start_engine(State(state): State<AppState>) -> Result<Json<EngineStatus>, ApiError> {
    state.guidance()?.start()?;
    Ok(Json(EngineStatus { running: true }))
}

/// GET /stop — halt periodic evaluation; state and suggestions survive.
pub async fn stop_engine(State(state): State<AppState>) -> Result<Json<EngineStatus>, ApiError> {
    state.guidance()?.stop().await?;
    Ok(Json(EngineStatus { running: false }))
}

/// GET /suggestions — snapshot of the live suggestion list.
pub async fn list_suggestions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Envelope>>, ApiError> {
    Ok(Json(state.guidance()?.suggestions().await))
}

/// POST /state/update — merge key-value pairs into the state vector.
///
/// Returns the applied delta. With the `re_evaluate_*` flags set, the
/// corresponding passes run immediately (strategies before actions, matching
/// the scheduled order).
pub async fn update_state(
    State(state): State<AppState>,
    Json(body): Json<StateVectorUpdate>,
) -> Result<Json<Delta>, ApiError> {
    let service = state.guidance()?;
    let delta = service.update_state(body.updates).await;
    if body.re_evaluate_strategies {
        service.evaluate_strategies().await;
    }
    if body.re_evaluate_actions {
        service.evaluate_actions().await;
    }
    Ok(Json(delta))
}

/// POST /state/update_with_callback — run a registered state callback; its
/// return value is the new delta and the response body.
pub async fn update_with_callback(
    State(state): State<AppState>,
    Json(body): Json<CallbackUpdate>,
) -> Result<Json<Delta>, ApiError> {
    let service = state.guidance()?;
    let delta = service
        .update_with_callback(&body.callback, body.params)
        .await?;
    if body.re_evaluate_strategies {
        service.evaluate_strategies().await;
    }
    if body.re_evaluate_actions {
        service.evaluate_actions().await;
    }
    Ok(Json(delta))
}

/// POST /accept
pub async fn accept_suggestion(
    state: State<AppState>,
    Json(body): Json<InteractionRequest>,
) -> Result<Json<Envelope>, ApiError> {
    apply_interaction(&state, &body.id, Interaction::Accept).await
}

/// POST /reject
pub async fn reject_suggestion(
    state: State<AppState>,
    Json(body): Json<InteractionRequest>,
) -> Result<Json<Envelope>, ApiError> {
    apply_interaction(&state, &body.id, Interaction::Reject).await
}

/// POST /preview_start
pub async fn preview_start(
    state: State<AppState>,
    Json(body): Json<InteractionRequest>,
) -> Result<Json<Envelope>, ApiError> {
    apply_interaction(&state, &body.id, Interaction::PreviewStart).await
}

/// POST /preview_end
pub async fn preview_end(
    state: State<AppState>,
    Json(body): Json<InteractionRequest>,
) -> Result<Json<Envelope>, ApiError> {
    apply_interaction(&state, &body.id, Interaction::PreviewEnd).await
}

async fn apply_interaction(
    state: &AppState,
    id: &SuggestionId,
    interaction: Interaction,
) -> Result<Json<Envelope>, ApiError> {
    let envelope = state.guidance()?.interact(id, interaction).await?;
    Ok(Json(envelope))
}

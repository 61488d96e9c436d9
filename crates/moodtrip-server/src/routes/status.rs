//! Service status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

/// GET /api/status: collaborator availability and pipeline settings.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = state.orchestrator.status();
    let chains = state.orchestrator.services().gateway.chains();
    let pipeline = &state.config.pipeline;

    Json(serde_json::json!({
        "modelAvailable": status.model_available,
        "weatherAvailable": status.weather_available,
        "visionModels": chains.vision,
        "textModels": chains.text,
        "sessionBackend": pipeline.session_backend,
        "topK": pipeline.top_k,
        "maxQuestions": pipeline.max_questions,
        "activeSessions": state.session_count(),
    }))
}

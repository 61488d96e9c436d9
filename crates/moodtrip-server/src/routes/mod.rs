//! HTTP route handlers under `/api`.

pub mod chat;
pub mod keywords;
pub mod recommendations;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use moodtrip_core::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(keywords::routes())
        .merge(chat::routes())
        .merge(recommendations::routes())
}

/// JSON error body with a status chosen by error kind.
pub(crate) fn error_response(e: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::ProviderUnavailable(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}

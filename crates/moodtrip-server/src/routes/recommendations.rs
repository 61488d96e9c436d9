//! Recommendation route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use moodtrip_core::{Error, KeywordSet, QuestionAnswer, TravelQuestionnaire};
use moodtrip_runtime::{Recommendation, RecommendationRequest};
use serde::Deserialize;

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/recommendations", post(recommend))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    /// When set, the session's own recommendation is returned and the
    /// remaining fields are ignored.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub keywords: KeywordSet,
    #[serde(default)]
    pub questionnaire: Option<TravelQuestionnaire>,
    #[serde(default)]
    pub answers: Vec<QuestionAnswer>,
}

/// POST /api/recommendations: ranked, enriched top-K places.
///
/// With a `sessionId` this is the result of the single run triggered when the
/// dialogue completed (409 while it is still open). Without one the pipeline
/// runs directly on the request.
async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> impl IntoResponse {
    if let Some(session_id) = req.session_id.as_deref() {
        let Some(session) = state.session(session_id) else {
            return error_response(&Error::NotFound(format!("session {}", session_id)));
        };
        return match session.recommendation().await {
            Ok(recommendation) => body_response(recommendation.as_ref()),
            Err(e) => error_response(&e),
        };
    }

    let Some(questionnaire) = req.questionnaire else {
        return error_response(&Error::InvalidInput("questionnaire is required".into()));
    };
    let request = RecommendationRequest {
        keywords: req.keywords,
        questionnaire,
        answers: req.answers,
    };
    match state.orchestrator.recommend(request).await {
        Ok(recommendation) => body_response(&recommendation),
        Err(e) => error_response(&e),
    }
}

fn body_response(recommendation: &Recommendation) -> (StatusCode, Json<serde_json::Value>) {
    match serde_json::to_value(recommendation) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => error_response(&Error::Json(e)),
    }
}

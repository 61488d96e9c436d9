//! Dialogue routes: /api/chat/{init, answer, skip, finish, reset}.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use moodtrip_core::{ConversationTurn, Error, KeywordSet, QuestionAnswer, TravelQuestionnaire};
use moodtrip_dialogue::{AnswerOutcome, DialogueContext, DialogueEngine, DialogueState};
use moodtrip_runtime::{new_session_id, TripSession};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/init", post(init))
        .route("/chat/answer", post(answer))
        .route("/chat/skip", post(skip))
        .route("/chat/finish", post(finish))
        .route("/chat/reset", post(reset))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub keywords: KeywordSet,
    #[serde(default)]
    pub questionnaire: Option<TravelQuestionnaire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub session_id: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: String,
}

/// Client-facing snapshot of one dialogue session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub state: DialogueState,
    pub turns: Vec<ConversationTurn>,
    pub question_count: usize,
    pub complete: bool,
    pub additional_answers: Vec<QuestionAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl SessionView {
    fn of(engine: &DialogueEngine) -> Self {
        Self {
            session_id: engine.session_id().to_string(),
            state: engine.state(),
            turns: engine.turns(),
            question_count: engine.question_count(),
            complete: engine.is_complete(),
            additional_answers: engine.additional_answers(),
            outcome: None,
            question: None,
        }
    }

    fn with_outcome(mut self, outcome: AnswerOutcome) -> Self {
        let (label, question) = match outcome {
            AnswerOutcome::NextQuestion(q) => ("question", Some(q)),
            AnswerOutcome::Completed => ("completed", None),
            AnswerOutcome::Ignored => ("ignored", None),
        };
        self.outcome = Some(label);
        self.question = question;
        self
    }
}

fn view_response(view: SessionView) -> (StatusCode, Json<serde_json::Value>) {
    match serde_json::to_value(view) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => error_response(&Error::Json(e)),
    }
}

fn lookup(state: &AppState, session_id: &str) -> Result<Arc<TripSession>, Error> {
    state
        .session(session_id)
        .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
}

/// POST /api/chat/init: start or resume a session and return its first question.
async fn init(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_session_id);
    if let Some(session) = state.session(&session_id) {
        return view_response(SessionView::of(session.engine()));
    }
    if let Some(q) = &req.questionnaire {
        if let Err(e) = q.validate() {
            return error_response(&e);
        }
    }

    let context = DialogueContext {
        keywords: req.keywords,
        questionnaire: req.questionnaire,
    };
    // Claim the id before asking anything so a racing init reuses this session.
    let session = state.insert_session(state.orchestrator.new_session(Some(session_id), context));
    match session.engine().init().await {
        Ok(_) => view_response(SessionView::of(session.engine())),
        Err(e) => error_response(&e),
    }
}

/// POST /api/chat/answer: submit an answer; a no-op while the previous one is processing.
async fn answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> impl IntoResponse {
    let session = match lookup(&state, &req.session_id) {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };
    let engine = session.engine();
    match engine.submit_answer(&req.answer).await {
        Ok(outcome) => view_response(SessionView::of(engine).with_outcome(outcome)),
        Err(e) => error_response(&e),
    }
}

/// POST /api/chat/skip: skip the remaining questions.
async fn skip(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> impl IntoResponse {
    match lookup(&state, &req.session_id) {
        Ok(session) => {
            session.engine().skip().await;
            view_response(SessionView::of(session.engine()))
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/chat/finish: complete the session now.
async fn finish(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> impl IntoResponse {
    match lookup(&state, &req.session_id) {
        Ok(session) => {
            session.engine().force_complete().await;
            view_response(SessionView::of(session.engine()))
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/chat/reset: drop the live session and its stored turns so the
/// next init starts a new flow.
async fn reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> impl IntoResponse {
    let evicted = state.remove_session(&req.session_id).is_some();
    match state.orchestrator.clear_session(&req.session_id).await {
        Ok(cleared) => {
            info!(
                "Reset session {} (live: {}, stored turns: {})",
                req.session_id, evicted, cleared
            );
            (
                StatusCode::OK,
                Json(json!({
                    "sessionId": req.session_id,
                    "evicted": evicted,
                    "clearedTurns": cleared,
                })),
            )
        }
        Err(e) => error_response(&e),
    }
}

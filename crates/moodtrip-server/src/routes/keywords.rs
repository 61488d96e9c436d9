//! Keyword extraction route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use moodtrip_core::{Error, Result};
use moodtrip_infer::{ExtractionInput, MediaBlob};
use serde::Deserialize;

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/keywords", post(extract_keywords))
}

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Base64 payloads or data URLs.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

impl KeywordsRequest {
    fn into_input(self) -> Result<ExtractionInput> {
        let missing = |field: &str| Error::InvalidInput(format!("{} is required for type {}", field, self.kind));
        match self.kind.as_str() {
            "image" | "images" => {
                if self.images.is_empty() {
                    return Err(missing("images"));
                }
                let blobs = self
                    .images
                    .iter()
                    .map(|data| MediaBlob::from_base64(data, "image/jpeg"))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ExtractionInput::Images(blobs))
            }
            "video" => {
                let data = self.video.as_deref().ok_or_else(|| missing("video"))?;
                Ok(ExtractionInput::Video(MediaBlob::from_base64(data, "video/mp4")?))
            }
            "audio" => {
                let data = self.audio.as_deref().ok_or_else(|| missing("audio"))?;
                Ok(ExtractionInput::Audio(MediaBlob::from_base64(data, "audio/mpeg")?))
            }
            "text" => {
                let text = self.text.clone().ok_or_else(|| missing("text"))?;
                Ok(ExtractionInput::Text(text))
            }
            other => Err(Error::InvalidInput(format!("unknown input type: {}", other))),
        }
    }
}

/// POST /api/keywords: emotion and spatial keywords from one submission.
async fn extract_keywords(
    State(state): State<Arc<AppState>>,
    Json(req): Json<KeywordsRequest>,
) -> impl IntoResponse {
    let input = match req.into_input() {
        Ok(input) => input,
        Err(e) => return error_response(&e),
    };

    match state.orchestrator.extract_keywords(&input).await {
        Ok(keywords) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "keywords": keywords,
                "modality": input.modality(),
            })),
        ),
        Err(e) => error_response(&e),
    }
}

//! A dialogue session bound to the one recommendation its completion produces.

use std::sync::Arc;

use moodtrip_core::Error;
use moodtrip_dialogue::DialogueEngine;
use tokio::sync::watch;

use crate::types::Recommendation;

/// Where a session's recommendation stands.
#[derive(Debug, Clone)]
pub enum RecommendationStatus {
    /// Dialogue still open, or the pipeline is running.
    Pending,
    Ready(Arc<Recommendation>),
    Failed(Arc<Error>),
}

pub struct TripSession {
    engine: Arc<DialogueEngine>,
    status: watch::Receiver<RecommendationStatus>,
}

impl TripSession {
    pub(crate) fn new(engine: Arc<DialogueEngine>, status: watch::Receiver<RecommendationStatus>) -> Self {
        Self { engine, status }
    }

    pub fn engine(&self) -> &Arc<DialogueEngine> {
        &self.engine
    }

    pub fn session_id(&self) -> &str {
        self.engine.session_id()
    }

    pub fn status(&self) -> RecommendationStatus {
        self.status.borrow().clone()
    }

    /// The recommendation produced when the dialogue completed.
    ///
    /// `Conflict` while the dialogue is still open. Every caller after
    /// completion gets the same result; the pipeline never runs twice.
    pub async fn recommendation(&self) -> Result<Arc<Recommendation>, Arc<Error>> {
        if !self.engine.is_complete() {
            return Err(Arc::new(Error::Conflict(format!(
                "session {} has not finished its dialogue",
                self.session_id()
            ))));
        }

        let mut rx = self.status.clone();
        let status = match rx
            .wait_for(|s| !matches!(s, RecommendationStatus::Pending))
            .await
        {
            Ok(status) => status.clone(),
            Err(_) => {
                return Err(Arc::new(Error::Internal(format!(
                    "recommendation task for {} ended without a result",
                    self.session_id()
                ))))
            }
        };

        match status {
            RecommendationStatus::Ready(recommendation) => Ok(recommendation),
            RecommendationStatus::Failed(e) => Err(e),
            RecommendationStatus::Pending => Err(Arc::new(Error::Internal("recommendation still pending".into()))),
        }
    }
}

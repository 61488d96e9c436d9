//! Orchestrator: the verbs the application layer calls.

use std::sync::Arc;

use moodtrip_core::{
    pair_answers, CandidatePlace, EnrichedPlace, Error, KeywordSet, Result, ScoredPlace,
};
use moodtrip_dialogue::{DialogueContext, DialogueEngine};
use moodtrip_enrich::EnrichmentContext;
use moodtrip_infer::ExtractionInput;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::services::Services;
use crate::session::{RecommendationStatus, TripSession};
use crate::types::{Recommendation, RecommendationRequest, ServiceStatus};

/// Prefix of generated session ids.
pub const SESSION_PREFIX: &str = "session_";

pub fn new_session_id() -> String {
    format!("{}{}", SESSION_PREFIX, uuid::Uuid::new_v4())
}

#[derive(Clone)]
pub struct Orchestrator {
    services: Arc<Services>,
}

impl Orchestrator {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn status(&self) -> ServiceStatus {
        self.services.status
    }

    /// Keyword stage. `ExtractionFailed` is the only error callers must surface.
    pub async fn extract_keywords(&self, input: &ExtractionInput) -> Result<KeywordSet> {
        self.services.extractor.extract(input).await
    }

    /// Score and order every candidate. Equal scores keep input order.
    pub fn rank_places(&self, keywords: &KeywordSet, candidates: Vec<CandidatePlace>) -> Vec<ScoredPlace> {
        self.services.scorer.rank(candidates, keywords)
    }

    /// Enrich already-ranked places without reordering them.
    pub async fn enrich(&self, ranked: &[ScoredPlace], ctx: &EnrichmentContext) -> Vec<EnrichedPlace> {
        self.services.aggregator.enrich(ranked, ctx).await
    }

    /// Search around the departure location, rank, keep top-K and enrich.
    pub async fn recommend(&self, request: RecommendationRequest) -> Result<Recommendation> {
        request.questionnaire.validate()?;
        if request.keywords.is_empty() {
            return Err(Error::InvalidInput("at least one keyword is required".into()));
        }

        let region = request.questionnaire.search_region().to_string();
        let candidates = self.services.places.search(&request.keywords, &region).await?;
        let candidates_found = candidates.len();
        if candidates_found == 0 {
            warn!("No places found for [{}] in {}", request.keywords.joined(), region);
        }

        let ranked = self
            .services
            .scorer
            .top_k(candidates, &request.keywords, self.services.pipeline.top_k);

        let ctx = EnrichmentContext {
            keywords: request.keywords,
            questionnaire: request.questionnaire,
            answers: request.answers,
        };
        let places = self.enrich(&ranked, &ctx).await;

        let recommendation = Recommendation {
            keywords: ctx.keywords,
            region,
            candidates_found,
            places,
        };
        info!(
            "Recommended {} of {} places in {} ({} partial)",
            recommendation.places.len(),
            candidates_found,
            recommendation.region,
            recommendation.partial_count()
        );
        Ok(recommendation)
    }

    /// Create a session for `session_id` (a fresh id when `None`) without
    /// asking anything yet.
    ///
    /// When the dialogue completes, `recommend` runs once with the session's
    /// keywords, questionnaire and gathered answers; the result is kept on
    /// the returned session. Must be called inside a tokio runtime.
    pub fn new_session(&self, session_id: Option<String>, context: DialogueContext) -> TripSession {
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_session_id);
        let keywords = context.keywords.clone();
        let questionnaire = context.questionnaire.clone();
        let engine = Arc::new(DialogueEngine::new(
            session_id.clone(),
            context,
            self.services.store.clone(),
            self.services.gateway.clone(),
            self.services.pipeline.max_questions,
        ));

        let (tx, rx) = watch::channel(RecommendationStatus::Pending);
        if let Some(done) = engine.completion() {
            let orchestrator = self.clone();
            tokio::spawn(async move {
                // The sender lives in the engine; dropping the session ends this task.
                let Ok(turns) = done.await else {
                    debug!("Session {} closed before completing", session_id);
                    return;
                };
                let status = match questionnaire {
                    Some(questionnaire) => {
                        let request = RecommendationRequest {
                            keywords,
                            questionnaire,
                            answers: pair_answers(&turns),
                        };
                        match orchestrator.recommend(request).await {
                            Ok(recommendation) => RecommendationStatus::Ready(Arc::new(recommendation)),
                            Err(e) => {
                                warn!("Recommendation for session {} failed: {}", session_id, e);
                                RecommendationStatus::Failed(Arc::new(e))
                            }
                        }
                    }
                    None => RecommendationStatus::Failed(Arc::new(Error::InvalidInput(format!(
                        "session {} was opened without a questionnaire",
                        session_id
                    )))),
                };
                let _ = tx.send(status);
            });
        }
        TripSession::new(engine, rx)
    }

    /// `new_session` followed by `init`, resuming any stored history.
    pub async fn open_dialogue(
        &self,
        session_id: Option<String>,
        context: DialogueContext,
    ) -> Result<Arc<TripSession>> {
        let session = Arc::new(self.new_session(session_id, context));
        session.engine().init().await?;
        Ok(session)
    }

    /// Forget a session's stored turns.
    pub async fn clear_session(&self, session_id: &str) -> Result<usize> {
        self.services.store.clear(session_id).await
    }
}

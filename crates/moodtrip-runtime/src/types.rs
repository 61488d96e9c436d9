use moodtrip_core::{EnrichedPlace, KeywordSet, QuestionAnswer, TravelQuestionnaire};
use serde::Serialize;

/// Inputs of one recommendation run.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub keywords: KeywordSet,
    pub questionnaire: TravelQuestionnaire,
    /// Dialogue answers, used as extra advice context.
    pub answers: Vec<QuestionAnswer>,
}

/// Ranked and enriched places for one request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub keywords: KeywordSet,
    pub region: String,
    /// Candidates returned by place search before truncation to top-K.
    pub candidates_found: usize,
    pub places: Vec<EnrichedPlace>,
}

impl Recommendation {
    pub fn partial_count(&self) -> usize {
        self.places.iter().filter(|p| p.is_partial()).count()
    }
}

/// Which optional collaborators are live.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub model_available: bool,
    pub weather_available: bool,
}

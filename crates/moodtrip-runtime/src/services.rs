//! Process-wide service graph.
//!
//! Every collaborator is constructed once here and handed to the components
//! that need it. Tests swap in fakes through `ServiceParts`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moodtrip_core::{Error, ModelConfig, MoodTripConfig, PipelineConfig, Result};
use moodtrip_enrich::{
    EmptyReviewProvider, EnrichmentAggregator, NominatimPlaceSearch, OpenWeatherProvider,
    PlaceSearch, ReviewProvider, WeatherProvider,
};
use moodtrip_infer::{
    AudioAnalyzer, ChatCompletionsClient, FallbackChains, FfmpegFrameSampler, FrameSampler,
    HeuristicAudioAnalyzer, KeywordExtractor, MediaBlob, ModelGateway, TextModel, VisionModel,
};
use moodtrip_rank::PlaceScorer;
use moodtrip_store::{open_session_store, SessionStore};
use tracing::{info, warn};

use crate::types::ServiceStatus;

/// Stand-in for both model capabilities when no API key is configured.
/// Every call fails, so each stage takes its documented fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredModel;

#[async_trait]
impl TextModel for UnconfiguredModel {
    async fn complete(&self, _prompt: &str, _model_id: &str) -> Result<String> {
        Err(Error::ProviderUnavailable("model API key not configured".into()))
    }
}

#[async_trait]
impl VisionModel for UnconfiguredModel {
    async fn analyze(&self, _image: &MediaBlob, _prompt: &str, _model_id: &str) -> Result<String> {
        Err(Error::ProviderUnavailable("model API key not configured".into()))
    }
}

/// Raw collaborators, before they are wired together.
pub struct ServiceParts {
    pub vision: Arc<dyn VisionModel>,
    pub text: Arc<dyn TextModel>,
    pub chains: FallbackChains,
    pub attempt_timeout: Duration,
    pub frames: Arc<dyn FrameSampler>,
    pub audio: Arc<dyn AudioAnalyzer>,
    pub places: Arc<dyn PlaceSearch>,
    pub weather: Arc<dyn WeatherProvider>,
    pub reviews: Arc<dyn ReviewProvider>,
    pub store: Arc<dyn SessionStore>,
    pub status: ServiceStatus,
}

pub struct Services {
    pub pipeline: PipelineConfig,
    pub gateway: Arc<ModelGateway>,
    pub extractor: KeywordExtractor,
    pub scorer: PlaceScorer,
    pub places: Arc<dyn PlaceSearch>,
    pub aggregator: EnrichmentAggregator,
    pub store: Arc<dyn SessionStore>,
    pub status: ServiceStatus,
}

impl Services {
    /// Wire collaborators into the pipeline components.
    pub fn assemble(parts: ServiceParts, pipeline: PipelineConfig) -> Self {
        let gateway = Arc::new(ModelGateway::new(
            parts.vision,
            parts.text,
            parts.chains,
            parts.attempt_timeout,
        ));
        let extractor = KeywordExtractor::new(gateway.clone(), parts.frames, parts.audio);
        let aggregator = EnrichmentAggregator::new(
            parts.places.clone(),
            parts.weather,
            parts.reviews,
            gateway.clone(),
        );
        Self {
            scorer: PlaceScorer::new(pipeline.weights),
            pipeline,
            gateway,
            extractor,
            places: parts.places,
            aggregator,
            store: parts.store,
            status: parts.status,
        }
    }

    /// Build the production graph: HTTP chat-completions model, Nominatim,
    /// OpenWeather and the configured session store.
    pub fn from_config(config: &MoodTripConfig, model: &ModelConfig) -> Result<Self> {
        let (vision, text, model_available): (Arc<dyn VisionModel>, Arc<dyn TextModel>, bool) =
            match ChatCompletionsClient::new(model) {
                Ok(client) => {
                    let client = Arc::new(client);
                    (client.clone(), client, true)
                }
                Err(e) => {
                    warn!("Model client disabled: {}", e);
                    (Arc::new(UnconfiguredModel), Arc::new(UnconfiguredModel), false)
                }
            };

        let pipeline = config.pipeline.clone();
        let weather = OpenWeatherProvider::new(pipeline.weather_api_key.clone())?;
        let weather_available = weather.is_configured();
        let places = NominatimPlaceSearch::new(pipeline.nominatim_url.clone())?;
        let store = open_session_store(pipeline.session_backend, &config.data_paths.sessions)?;

        info!(
            "Services ready: model={}, weather={}, sessions={:?}",
            model_available, weather_available, pipeline.session_backend
        );

        let parts = ServiceParts {
            vision,
            text,
            chains: FallbackChains::from_config(model),
            attempt_timeout: model.timeout(),
            frames: Arc::new(FfmpegFrameSampler::default()),
            audio: Arc::new(HeuristicAudioAnalyzer),
            places: Arc::new(places),
            weather: Arc::new(weather),
            reviews: Arc::new(EmptyReviewProvider),
            store,
            status: ServiceStatus {
                model_available,
                weather_available,
            },
        };
        Ok(Self::assemble(parts, pipeline))
    }
}

#[cfg(test)]
mod tests {
    use moodtrip_core::SessionBackend;

    use super::*;

    #[tokio::test]
    async fn test_from_config_without_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MoodTripConfig::from_env(dir.path()).unwrap();
        config.pipeline.weather_api_key = None;
        config.pipeline.session_backend = SessionBackend::Sqlite;
        let model = ModelConfig::default();

        let services = Services::from_config(&config, &model).unwrap();
        assert!(!services.status.model_available);
        assert!(!services.status.weather_available);
        assert!(config.data_paths.sessions.join("sessions.db").exists());

        let err = services.gateway.complete("hi").await.unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable(_)));
    }
}

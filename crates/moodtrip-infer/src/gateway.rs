//! Ordered model fallback.
//!
//! Each capability has a chain of model ids. A call walks the chain once,
//! first to last, with a per-attempt timeout. Any failure (transport error,
//! non-2xx, timeout, empty content) moves on to the next id; the same id is
//! never retried. Only when the whole chain is exhausted does the caller see
//! `ProviderUnavailable`.

use std::sync::Arc;
use std::time::Duration;

use moodtrip_core::{Error, ModelConfig, Result};
use tracing::{debug, info, warn};

use crate::media::MediaBlob;
use crate::model::{Capability, TextModel, VisionModel};

/// Model ids per capability, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChains {
    pub vision: Vec<String>,
    pub text: Vec<String>,
}

impl FallbackChains {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            vision: config.vision_models.clone(),
            text: config.text_models.clone(),
        }
    }

    pub fn chain(&self, capability: Capability) -> &[String] {
        match capability {
            Capability::VisionFeatures => &self.vision,
            Capability::TextGeneration => &self.text,
        }
    }
}

/// What to send on each attempt.
#[derive(Debug, Clone, Copy)]
pub enum ModelPayload<'a> {
    Vision { image: &'a MediaBlob, prompt: &'a str },
    Text { prompt: &'a str },
}

impl ModelPayload<'_> {
    fn capability(&self) -> Capability {
        match self {
            ModelPayload::Vision { .. } => Capability::VisionFeatures,
            ModelPayload::Text { .. } => Capability::TextGeneration,
        }
    }
}

pub struct ModelGateway {
    vision: Arc<dyn VisionModel>,
    text: Arc<dyn TextModel>,
    chains: FallbackChains,
    attempt_timeout: Duration,
}

impl ModelGateway {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        text: Arc<dyn TextModel>,
        chains: FallbackChains,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            vision,
            text,
            chains,
            attempt_timeout,
        }
    }

    pub fn chains(&self) -> &FallbackChains {
        &self.chains
    }

    /// Try each model in `models` until one returns non-empty content.
    pub async fn call(
        &self,
        capability: Capability,
        models: &[String],
        payload: ModelPayload<'_>,
    ) -> Result<String> {
        if payload.capability() != capability {
            return Err(Error::InvalidInput(format!(
                "{} payload sent to {} chain",
                payload.capability(),
                capability
            )));
        }

        let mut failures = Vec::with_capacity(models.len());
        for model in models {
            let attempt = async {
                match payload {
                    ModelPayload::Vision { image, prompt } => {
                        self.vision.analyze(image, prompt, model).await
                    }
                    ModelPayload::Text { prompt } => self.text.complete(prompt, model).await,
                }
            };

            match tokio::time::timeout(self.attempt_timeout, attempt).await {
                Ok(Ok(content)) if !content.trim().is_empty() => {
                    debug!("{} served by {}", capability, model);
                    return Ok(content);
                }
                Ok(Ok(_)) => {
                    warn!("{} model {} returned empty content", capability, model);
                    failures.push(format!("{}: empty", model));
                }
                Ok(Err(e)) => {
                    warn!("{} model {} failed: {}", capability, model, e);
                    failures.push(format!("{}: {}", model, e));
                }
                Err(_) => {
                    warn!(
                        "{} model {} timed out after {:?}",
                        capability, model, self.attempt_timeout
                    );
                    failures.push(format!("{}: timeout", model));
                }
            }
        }

        info!("{} chain exhausted after {} attempts", capability, failures.len());
        Err(Error::ProviderUnavailable(if failures.is_empty() {
            format!("no {} models configured", capability)
        } else {
            format!("all {} models failed ({})", capability, failures.join("; "))
        }))
    }

    /// Vision call over the configured vision chain.
    pub async fn analyze_image(&self, image: &MediaBlob, prompt: &str) -> Result<String> {
        self.call(
            Capability::VisionFeatures,
            &self.chains.vision,
            ModelPayload::Vision { image, prompt },
        )
        .await
    }

    /// Text call over the configured text chain.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        self.call(
            Capability::TextGeneration,
            &self.chains.text,
            ModelPayload::Text { prompt },
        )
        .await
    }
}

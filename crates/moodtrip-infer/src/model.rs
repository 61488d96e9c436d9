//! Model capability contracts.

use async_trait::async_trait;
use moodtrip_core::Result;

use crate::media::MediaBlob;

/// A named external operation behind a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Structured perceptual-feature description of an image.
    VisionFeatures,
    /// Free text completion.
    TextGeneration,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::VisionFeatures => write!(f, "vision-features"),
            Capability::TextGeneration => write!(f, "text-generation"),
        }
    }
}

/// Image understanding model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Describe `image` according to `prompt` using the model `model_id`.
    async fn analyze(&self, image: &MediaBlob, prompt: &str, model_id: &str) -> Result<String>;
}

/// Text completion model.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str, model_id: &str) -> Result<String>;
}

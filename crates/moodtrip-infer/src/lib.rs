//! MoodTrip Infer: model fallback gateway and multimodal keyword extraction.
//!
//! `ModelGateway` walks an ordered list of model identifiers per capability and
//! returns the first non-empty completion. `KeywordExtractor` turns image,
//! audio, video or text input into a `KeywordSet` on top of the gateway and the
//! rule tables in `moodtrip-rules`.

pub mod extract;
pub mod gateway;
pub mod http;
pub mod json;
pub mod media;
pub mod model;

pub use extract::{ExtractionInput, KeywordExtractor};
pub use gateway::{FallbackChains, ModelGateway, ModelPayload};
pub use http::ChatCompletionsClient;
pub use media::{AudioAnalyzer, FfmpegFrameSampler, FrameSampler, HeuristicAudioAnalyzer, MediaBlob};
pub use model::{Capability, TextModel, VisionModel};

//! MoodTrip Rules: map raw perceptual features to emotion and spatial-tendency keywords.
//!
//! Everything here is pure: fixed lookup tables keyed by substring containment,
//! no I/O, no errors. Unknown tokens contribute nothing.

pub mod audio;
pub mod features;
pub mod image;
mod table;

pub use audio::{map_audio, map_audio_to_emotions, map_audio_to_spatial_tendencies, AudioFeatures, AUDIO_FALLBACK_KEYWORDS};
pub use features::{Brightness, Contrast, PerceptualFeatures};
pub use image::{map_features, map_to_emotions, map_to_spatial_tendencies};

//! Audio feature rules, parallel to the image tables.

use moodtrip_core::KeywordSet;
use serde::{Deserialize, Serialize};

use crate::table::{apply_first, Rule};

/// Keywords used when no audio strategy produced anything.
pub const AUDIO_FALLBACK_KEYWORDS: &[&str] = &["音乐", "音频", "声音"];

/// Heuristic description of an audio clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub tempo: String,
    pub mood: String,
    #[serde(default)]
    pub instruments: Vec<String>,
    pub rhythm: String,
    pub volume: String,
}

impl Default for AudioFeatures {
    /// The neutral record returned when no real analysis is available.
    fn default() -> Self {
        Self {
            tempo: "中等".into(),
            mood: "中性".into(),
            instruments: Vec::new(),
            rhythm: "中等".into(),
            volume: "中等".into(),
        }
    }
}

const TEMPO_EMOTIONS: &[Rule] = &[
    Rule { needles: &["快", "fast"], tags: &["活力", "兴奋", "动感"] },
    Rule { needles: &["慢", "slow"], tags: &["放松", "宁静", "舒缓"] },
];

const MOOD_EMOTIONS: &[Rule] = &[
    Rule { needles: &["快乐", "欢快", "happy", "cheerful"], tags: &["快乐", "积极", "开朗"] },
    Rule { needles: &["悲伤", "忧郁", "sad", "melancholy"], tags: &["深沉", "安静", "内省"] },
    Rule { needles: &["平静", "calm"], tags: &["平静", "放松", "舒适"] },
];

const VOLUME_EMOTIONS: &[Rule] = &[
    Rule { needles: &["大", "响亮", "loud"], tags: &["强烈", "震撼", "活力"] },
    Rule { needles: &["小", "轻柔", "soft", "quiet"], tags: &["温柔", "安静", "私密"] },
];

const TEMPO_SPACES: &[Rule] = &[
    Rule { needles: &["快", "fast"], tags: &["动态", "活力", "探索"] },
    Rule { needles: &["慢", "slow"], tags: &["安静", "放松", "私密"] },
];

const MOOD_SPACES: &[Rule] = &[
    Rule { needles: &["快乐", "欢快", "happy", "cheerful"], tags: &["开阔", "户外", "阳光"] },
    Rule { needles: &["平静", "calm"], tags: &["安静", "自然", "放松"] },
];

/// Instrument rules look across the whole instrument list; first rule with any hit wins.
const INSTRUMENT_SPACES: &[Rule] = &[
    Rule { needles: &["自然", "鸟", "nature", "bird"], tags: &["自然", "户外", "森林"] },
    Rule { needles: &["城市", "电子", "urban", "electronic"], tags: &["城市", "现代", "活力"] },
];

pub fn map_audio_to_emotions(features: &AudioFeatures) -> KeywordSet {
    let mut out = KeywordSet::new();
    apply_first(&features.tempo, TEMPO_EMOTIONS, &mut out);
    apply_first(&features.mood, MOOD_EMOTIONS, &mut out);
    apply_first(&features.volume, VOLUME_EMOTIONS, &mut out);
    out
}

pub fn map_audio_to_spatial_tendencies(features: &AudioFeatures) -> KeywordSet {
    let mut out = KeywordSet::new();
    apply_first(&features.tempo, TEMPO_SPACES, &mut out);

    let instruments: Vec<String> = features
        .instruments
        .iter()
        .map(|i| i.trim().to_lowercase())
        .collect();
    if let Some(rule) = INSTRUMENT_SPACES
        .iter()
        .find(|r| instruments.iter().any(|i| r.needles.iter().any(|n| i.contains(n))))
    {
        out.extend(rule.tags.iter());
    }

    apply_first(&features.mood, MOOD_SPACES, &mut out);
    out
}

/// Emotions followed by spatial tendencies, deduplicated.
pub fn map_audio(features: &AudioFeatures) -> KeywordSet {
    let mut out = map_audio_to_emotions(features);
    out.merge(&map_audio_to_spatial_tendencies(features));
    out
}

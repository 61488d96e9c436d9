//! Perceptual features returned by the vision model.

use serde::{Deserialize, Deserializer, Serialize};

/// Objective description of one image or video frame.
///
/// Field values are the model's free text (e.g. `"明亮"`, `"开阔"`); the
/// mapper interprets them by substring. Lenient on input: list fields accept a
/// single string, and null or missing fields become empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerceptualFeatures {
    #[serde(default, deserialize_with = "string_or_list")]
    pub objects: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub colors: Vec<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub brightness: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub contrast: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub composition: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub texture: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub atmosphere: String,
}

impl PerceptualFeatures {
    /// Record used when the model reply cannot be parsed.
    pub fn neutral() -> Self {
        Self {
            brightness: "中等".into(),
            contrast: "中等".into(),
            ..Default::default()
        }
    }

    pub fn brightness_level(&self) -> Option<Brightness> {
        Brightness::classify(&self.brightness)
    }

    pub fn contrast_level(&self) -> Option<Contrast> {
        Contrast::classify(&self.contrast)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brightness {
    Bright,
    Medium,
    Dim,
}

impl Brightness {
    /// Classify free text. Blank text is `None`; unrecognised text is `Medium`.
    pub fn classify(raw: &str) -> Option<Self> {
        let v = raw.trim().to_lowercase();
        if v.is_empty() {
            None
        } else if v.contains('亮') || v.contains("bright") {
            Some(Self::Bright)
        } else if v.contains('暗') || v.contains("dim") || v.contains("dark") {
            Some(Self::Dim)
        } else {
            Some(Self::Medium)
        }
    }

    /// Whole-word variant: only 明亮/昏暗 (or their English forms) count,
    /// a bare 亮 or 暗 does not. Everything else is `None`.
    pub fn classify_strict(raw: &str) -> Option<Self> {
        let v = raw.trim().to_lowercase();
        if v.contains("明亮") || v.contains("bright") {
            Some(Self::Bright)
        } else if v.contains("昏暗") || v.contains("dim") || v.contains("dark") {
            Some(Self::Dim)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contrast {
    High,
    Medium,
    Low,
}

impl Contrast {
    pub fn classify(raw: &str) -> Option<Self> {
        let v = raw.trim().to_lowercase();
        if v.is_empty() {
            None
        } else if v.contains('高') || v.contains("high") {
            Some(Self::High)
        } else if v.contains('低') || v.contains("low") {
            Some(Self::Low)
        } else {
            Some(Self::Medium)
        }
    }
}

fn string_or_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<serde_json::Value>),
        Null,
    }

    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(s) => s
            .split(|c| c == ',' || c == '，' || c == '、')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        OneOrMany::Many(values) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        OneOrMany::Null => Vec::new(),
    })
}

fn string_or_null<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<serde_json::Value>::deserialize(d)?
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
        .unwrap_or_default())
}

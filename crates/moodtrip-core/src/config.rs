//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
pub const DEFAULT_VISION_MODELS: &[&str] = &["glm-4.7", "glm-4-flash", "glm-4v"];
pub const DEFAULT_TEXT_MODELS: &[&str] = &["glm-4.7", "glm-4-flash"];
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Paths to all MoodTrip data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite session database directory (`data/sessions/`).
    pub sessions: PathBuf,
    /// Model configuration (`data/model-config.json`).
    pub model_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            sessions: root.join("sessions"),
            model_config_file: root.join("model-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.sessions)?;
        Ok(paths)
    }
}

/// Which `SessionStore` implementation backs dialogue history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Process-local, lost on restart.
    Memory,
    /// SQLite file under `data/sessions/`.
    Sqlite,
}

impl SessionBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "local" => Some(Self::Memory),
            "sqlite" | "db" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Weights used by the place scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Multiplier applied to the provider rating.
    pub rating: f64,
    /// Bonus per matched keyword.
    pub keyword_match: f64,
    /// Distance bonus at zero meters.
    pub distance_ceiling: f64,
    /// Meters per lost bonus point.
    pub distance_divisor: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            rating: 10.0,
            keyword_match: 20.0,
            distance_ceiling: 50.0,
            distance_divisor: 100.0,
        }
    }
}

/// Tunables for the recommendation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of ranked candidates that get enriched.
    pub top_k: usize,
    /// Assistant question cap per dialogue session.
    pub max_questions: usize,
    pub weights: ScoringWeights,
    pub session_backend: SessionBackend,
    #[serde(skip_serializing)]
    pub weather_api_key: Option<String>,
    pub nominatim_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_questions: 3,
            weights: ScoringWeights::default(),
            session_backend: SessionBackend::Memory,
            weather_api_key: None,
            nominatim_url: DEFAULT_NOMINATIM_URL.into(),
        }
    }
}

impl PipelineConfig {
    /// Apply `MOODTRIP_*` overrides from `lookup`. Unparseable or out-of-range
    /// values are logged and the current value kept.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = lookup("MOODTRIP_SESSION_BACKEND") {
            match SessionBackend::parse(&backend) {
                Some(b) => self.session_backend = b,
                None => warn!("Unknown session backend '{}', using memory", backend),
            }
        }
        if let Some(k) = parse_var(&lookup, "MOODTRIP_TOP_K", |k: &usize| *k > 0) {
            self.top_k = k;
        }
        if let Some(n) = parse_var(&lookup, "MOODTRIP_MAX_QUESTIONS", |n: &usize| *n > 0) {
            self.max_questions = n;
        }
        if let Some(w) = parse_var(&lookup, "MOODTRIP_WEIGHT_RATING", |w: &f64| *w >= 0.0) {
            self.weights.rating = w;
        }
        if let Some(w) = parse_var(&lookup, "MOODTRIP_WEIGHT_KEYWORD", |w: &f64| *w >= 0.0) {
            self.weights.keyword_match = w;
        }
        if let Some(w) = parse_var(&lookup, "MOODTRIP_DISTANCE_CEILING", |w: &f64| *w >= 0.0) {
            self.weights.distance_ceiling = w;
        }
        if let Some(w) = parse_var(&lookup, "MOODTRIP_DISTANCE_DIVISOR", |w: &f64| *w > 0.0) {
            self.weights.distance_divisor = w;
        }
        self.weather_api_key = lookup("OPENWEATHER_API_KEY").filter(|k| !k.is_empty());
        if let Some(url) = lookup("MOODTRIP_NOMINATIM_URL") {
            self.nominatim_url = url;
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    valid: impl Fn(&T) -> bool,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) if valid(&v) => Some(v),
        _ => {
            warn!("Ignoring {}={}", key, raw);
            None
        }
    }
}

/// Top-level MoodTrip configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodTripConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    pub pipeline: PipelineConfig,
}

impl MoodTripConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3010);

        let data_paths = DataPaths::new(data_dir)?;

        let mut pipeline = PipelineConfig::default();
        pipeline.apply_overrides(|key| std::env::var(key).ok());

        Ok(Self {
            port,
            data_paths,
            pipeline,
        })
    }
}

/// Model endpoint and fallback chains (persisted to model-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Ordered vision model identifiers, premium first.
    #[serde(default = "default_vision_models")]
    pub vision_models: Vec<String>,
    /// Ordered text model identifiers, premium first.
    #[serde(default = "default_text_models")]
    pub text_models: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_vision_temperature")]
    pub vision_temperature: f64,
    #[serde(default = "default_text_temperature")]
    pub text_temperature: f64,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_vision_models() -> Vec<String> {
    DEFAULT_VISION_MODELS.iter().map(|s| s.to_string()).collect()
}
fn default_text_models() -> Vec<String> {
    DEFAULT_TEXT_MODELS.iter().map(|s| s.to_string()).collect()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_vision_temperature() -> f64 {
    0.3
}
fn default_text_temperature() -> f64 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            vision_models: default_vision_models(),
            text_models: default_text_models(),
            timeout_secs: default_timeout_secs(),
            vision_temperature: default_vision_temperature(),
            text_temperature: default_text_temperature(),
            config_path: PathBuf::new(),
        }
    }
}

impl ModelConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: ModelConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        config.config_path = config_path.to_path_buf();

        // Env vars as fallback for the key
        if config.api_key.is_none() {
            config.api_key = std::env::var("MOODTRIP_API_KEY")
                .or_else(|_| std::env::var("ZHIPU_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty());
        }
        if let Ok(url) = std::env::var("MOODTRIP_API_URL") {
            config.api_url = url;
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

//! Multimodal keyword extraction.

use std::sync::Arc;

use futures::future::join_all;
use moodtrip_core::{Error, KeywordSet, Result};
use moodtrip_rules::{map_audio, map_features, PerceptualFeatures, AUDIO_FALLBACK_KEYWORDS};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::gateway::ModelGateway;
use crate::json::parse_json_object;
use crate::media::{AudioAnalyzer, FrameSampler, MediaBlob};

const FEATURE_PROMPT: &str = "请客观描述这张图片的视觉特征，只返回JSON，不要任何解释。格式：\
{\"objects\": [\"画面中的主要物体\"], \"colors\": [\"主要颜色\"], \"brightness\": \"明亮/中等/昏暗\", \
\"contrast\": \"高/中等/低\", \"composition\": \"开阔/紧凑/对称等构图描述\", \
\"texture\": \"自然/光滑/粗糙等质感\", \"atmosphere\": \"空旷/密集/流动等氛围\"}";

fn structured_text_prompt(text: &str) -> String {
    format!(
        "分析以下文字表达的情绪和它暗示的空间偏好，只返回JSON：\
         {{\"emotions\": [\"情绪关键词\"], \"spatial_tendencies\": [\"空间倾向关键词\"]}}\n\n文字：{}",
        text
    )
}

fn simple_text_prompt(text: &str) -> String {
    format!("从以下文本中提取关键词，用逗号分隔：{}", text)
}

/// One user submission, by modality.
#[derive(Debug, Clone)]
pub enum ExtractionInput {
    Images(Vec<MediaBlob>),
    Video(MediaBlob),
    Audio(MediaBlob),
    Text(String),
}

impl ExtractionInput {
    pub fn modality(&self) -> &'static str {
        match self {
            ExtractionInput::Images(_) => "image",
            ExtractionInput::Video(_) => "video",
            ExtractionInput::Audio(_) => "audio",
            ExtractionInput::Text(_) => "text",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextKeywords {
    #[serde(default)]
    emotions: Vec<String>,
    #[serde(default, alias = "spatialTendencies")]
    spatial_tendencies: Vec<String>,
}

pub struct KeywordExtractor {
    gateway: Arc<ModelGateway>,
    frames: Arc<dyn FrameSampler>,
    audio: Arc<dyn AudioAnalyzer>,
}

impl KeywordExtractor {
    pub fn new(
        gateway: Arc<ModelGateway>,
        frames: Arc<dyn FrameSampler>,
        audio: Arc<dyn AudioAnalyzer>,
    ) -> Self {
        Self {
            gateway,
            frames,
            audio,
        }
    }

    /// Extract a non-empty keyword set, or `ExtractionFailed`.
    pub async fn extract(&self, input: &ExtractionInput) -> Result<KeywordSet> {
        let keywords = match input {
            ExtractionInput::Images(images) => self.from_images(images).await?,
            ExtractionInput::Video(video) => self.from_video(video).await?,
            ExtractionInput::Audio(audio) => self.from_audio(audio).await,
            ExtractionInput::Text(text) => self.from_text(text).await?,
        };
        info!("Extracted {} keywords from {} input", keywords.len(), input.modality());
        Ok(keywords)
    }

    async fn from_images(&self, images: &[MediaBlob]) -> Result<KeywordSet> {
        if images.is_empty() {
            return Err(Error::ExtractionFailed("no images supplied".into()));
        }

        let results = join_all(images.iter().map(|image| self.image_features(image))).await;

        let mut keywords = KeywordSet::new();
        let mut analyzed = 0usize;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(features) => {
                    analyzed += 1;
                    keywords.merge(&map_features(&features));
                }
                Err(e) => warn!("Skipping image {}: {}", i, e),
            }
        }

        if analyzed == 0 {
            return Err(Error::ExtractionFailed(format!(
                "none of {} images could be analyzed",
                images.len()
            )));
        }
        if keywords.is_empty() {
            return Err(Error::ExtractionFailed("image features matched no keywords".into()));
        }
        Ok(keywords)
    }

    /// One vision call. Unparseable replies degrade to the neutral feature record.
    async fn image_features(&self, image: &MediaBlob) -> Result<PerceptualFeatures> {
        let reply = self.gateway.analyze_image(image, FEATURE_PROMPT).await?;
        Ok(parse_json_object(&reply).unwrap_or_else(|e| {
            warn!("Vision reply not parseable, using neutral features: {}", e);
            PerceptualFeatures::neutral()
        }))
    }

    async fn from_video(&self, video: &MediaBlob) -> Result<KeywordSet> {
        let frame = self
            .frames
            .representative_frame(video)
            .await
            .map_err(|e| Error::ExtractionFailed(format!("frame sampling failed: {}", e)))?;
        debug!("Sampled {} byte frame from video", frame.bytes.len());
        self.from_images(std::slice::from_ref(&frame)).await
    }

    /// Never fails: falls back to a fixed minimal set.
    async fn from_audio(&self, audio: &MediaBlob) -> KeywordSet {
        let keywords = match self.audio.analyze(audio).await {
            Ok(features) => map_audio(&features),
            Err(e) => {
                warn!("Audio analysis failed: {}", e);
                KeywordSet::new()
            }
        };
        if keywords.is_empty() {
            debug!("Audio produced no keywords, using fallback set");
            return AUDIO_FALLBACK_KEYWORDS.iter().collect();
        }
        keywords
    }

    async fn from_text(&self, text: &str) -> Result<KeywordSet> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::ExtractionFailed("empty text".into()));
        }

        match self.structured_text_keywords(text).await {
            Ok(keywords) if !keywords.is_empty() => return Ok(keywords),
            Ok(_) => warn!("Structured text extraction returned no keywords"),
            Err(e) => warn!("Structured text extraction failed: {}", e),
        }

        let reply = self
            .gateway
            .complete(&simple_text_prompt(text))
            .await
            .map_err(|e| Error::ExtractionFailed(e.to_string()))?;
        let keywords = split_keywords(&reply);
        if keywords.is_empty() {
            return Err(Error::ExtractionFailed("text model returned no keywords".into()));
        }
        Ok(keywords)
    }

    async fn structured_text_keywords(&self, text: &str) -> Result<KeywordSet> {
        let reply = self.gateway.complete(&structured_text_prompt(text)).await?;
        let parsed: TextKeywords = parse_json_object(&reply)?;
        let mut keywords: KeywordSet = parsed.emotions.iter().collect();
        keywords.extend(parsed.spatial_tendencies.iter());
        Ok(keywords)
    }
}

/// Split a plain-text reply on ASCII, full-width and ideographic commas.
pub fn split_keywords(reply: &str) -> KeywordSet {
    reply
        .split(|c| matches!(c, ',' | '，' | '、' | '\n'))
        .map(|k| k.trim().trim_matches(|c: char| matches!(c, '"' | '“' | '”' | '。' | '.')))
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use moodtrip_rules::AudioFeatures;

    use super::*;
    use crate::gateway::testing::*;
    use crate::media::HeuristicAudioAnalyzer;

    struct FixedFrame(Option<MediaBlob>);

    #[async_trait]
    impl FrameSampler for FixedFrame {
        async fn representative_frame(&self, _video: &MediaBlob) -> Result<MediaBlob> {
            self.0
                .clone()
                .ok_or_else(|| Error::ProviderUnavailable("no decoder".into()))
        }
    }

    struct FixedAudio(Option<AudioFeatures>);

    #[async_trait]
    impl AudioAnalyzer for FixedAudio {
        async fn analyze(&self, _audio: &MediaBlob) -> Result<AudioFeatures> {
            self.0
                .clone()
                .ok_or_else(|| Error::ProviderUnavailable("analyzer offline".into()))
        }
    }

    fn extractor(model: Arc<ScriptedModel>) -> KeywordExtractor {
        let gw = ModelGateway::new(
            model.clone(),
            model,
            chains(&["v1", "v2"], &["t1"]),
            Duration::from_millis(200),
        );
        KeywordExtractor::new(
            Arc::new(gw),
            Arc::new(FixedFrame(Some(MediaBlob::new("image/jpeg", vec![9])))),
            Arc::new(HeuristicAudioAnalyzer),
        )
    }

    fn image() -> MediaBlob {
        MediaBlob::new("image/png", vec![1, 2, 3])
    }

    const LAKE_FEATURES: &str = r#"```json
{"objects": ["湖", "树"], "colors": ["蓝色"], "brightness": "明亮", "contrast": "", "composition": "", "texture": "", "atmosphere": ""}
```"#;

    #[tokio::test]
    async fn test_image_keywords_via_second_vision_model() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply("v1", Reply::Fail)
                .reply("v2", Reply::Text(LAKE_FEATURES.into())),
        );
        let kw = extractor(model)
            .extract(&ExtractionInput::Images(vec![image()]))
            .await
            .unwrap();
        for expected in ["宁静", "开朗", "水边", "森林"] {
            assert!(kw.contains(expected), "missing {}", expected);
        }
    }

    #[tokio::test]
    async fn test_images_union_and_skip_failures() {
        // First image parses, second gets prose (neutral), third fails on every model.
        let model = Arc::new(
            ScriptedModel::new()
                .reply("v1", Reply::Text(LAKE_FEATURES.into()))
                .reply("v1", Reply::Text("这是一张好看的照片".into()))
                .reply("v1", Reply::Fail),
        );
        let kw = extractor(model)
            .extract(&ExtractionInput::Images(vec![image(), image(), image()]))
            .await
            .unwrap();
        assert!(kw.contains("宁静"));
        // Neutral record contributes the medium-brightness tags.
        assert!(kw.contains("平衡"));
        let unique: std::collections::HashSet<_> = kw.iter().collect();
        assert_eq!(unique.len(), kw.len());
    }

    #[tokio::test]
    async fn test_all_images_fail() {
        let model = Arc::new(ScriptedModel::new());
        let err = extractor(model)
            .extract(&ExtractionInput::Images(vec![image(), image()]))
            .await
            .unwrap_err();
        assert!(err.is_fatal_for_extraction());
    }

    #[tokio::test]
    async fn test_video_uses_frame() {
        let model = Arc::new(ScriptedModel::new().reply("v1", Reply::Text(LAKE_FEATURES.into())));
        let kw = extractor(model)
            .extract(&ExtractionInput::Video(MediaBlob::new("video/mp4", vec![0; 8])))
            .await
            .unwrap();
        assert!(kw.contains("水边"));
    }

    #[tokio::test]
    async fn test_video_without_frame_fails() {
        let model = Arc::new(ScriptedModel::new().reply("v1", Reply::Text(LAKE_FEATURES.into())));
        let mut ex = extractor(model);
        ex.frames = Arc::new(FixedFrame(None));
        let err = ex
            .extract(&ExtractionInput::Video(MediaBlob::new("video/mp4", vec![0; 8])))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_audio_fallback_set() {
        let model = Arc::new(ScriptedModel::new());
        let kw = extractor(model)
            .extract(&ExtractionInput::Audio(MediaBlob::new("audio/mpeg", vec![1])))
            .await
            .unwrap();
        assert_eq!(kw.as_slice(), &["音乐", "音频", "声音"]);
    }

    #[tokio::test]
    async fn test_audio_analyzer_features_mapped() {
        let model = Arc::new(ScriptedModel::new());
        let mut ex = extractor(model);
        ex.audio = Arc::new(FixedAudio(Some(AudioFeatures {
            tempo: "慢".into(),
            ..Default::default()
        })));
        let kw = ex
            .extract(&ExtractionInput::Audio(MediaBlob::new("audio/mpeg", vec![1])))
            .await
            .unwrap();
        assert!(kw.contains("舒缓"));
        assert!(!kw.contains("音乐"));

        ex.audio = Arc::new(FixedAudio(None));
        let kw = ex
            .extract(&ExtractionInput::Audio(MediaBlob::new("audio/mpeg", vec![1])))
            .await
            .unwrap();
        assert!(kw.contains("音乐"));
    }

    #[tokio::test]
    async fn test_text_structured() {
        let model = Arc::new(ScriptedModel::new().reply(
            "t1",
            Reply::Text(r#"{"emotions": ["放松", "Calm"], "spatial_tendencies": ["海边", "calm"]}"#.into()),
        ));
        let kw = extractor(model)
            .extract(&ExtractionInput::Text("想去海边发呆".into()))
            .await
            .unwrap();
        assert_eq!(kw.as_slice(), &["放松", "calm", "海边"]);
    }

    #[tokio::test]
    async fn test_text_falls_back_to_simple_prompt() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply("t1", Reply::Text("我觉得你很想放松".into()))
                .reply("t1", Reply::Text("放松，海边、安静, 放松".into())),
        );
        let kw = extractor(model.clone())
            .extract(&ExtractionInput::Text("想去海边发呆".into()))
            .await
            .unwrap();
        assert_eq!(kw.as_slice(), &["放松", "海边", "安静"]);
        let prompts = model.prompts.lock();
        assert!(prompts[1].starts_with("从以下文本中提取关键词"));
    }

    #[tokio::test]
    async fn test_text_all_strategies_fail() {
        let model = Arc::new(ScriptedModel::new());
        let err = extractor(model)
            .extract(&ExtractionInput::Text("随便".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));

        let model = Arc::new(ScriptedModel::new());
        assert!(extractor(model)
            .extract(&ExtractionInput::Text("   ".into()))
            .await
            .is_err());
    }

    #[test]
    fn test_split_keywords() {
        let kw = split_keywords("“宁静”, 自然，海边、\n 。");
        assert_eq!(kw.as_slice(), &["宁静", "自然", "海边"]);
    }
}

//! OpenAI-compatible chat-completions client.
//!
//! One client serves both capabilities: text prompts go out as a single user
//! message, images as a multi-part message carrying a base64 data URL. The
//! model id is chosen per call by the gateway.

use async_trait::async_trait;
use moodtrip_core::{Error, ModelConfig, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::media::MediaBlob;
use crate::model::{TextModel, VisionModel};

pub struct ChatCompletionsClient {
    client: Client,
    api_url: String,
    api_key: String,
    vision_temperature: f64,
    text_temperature: f64,
}

impl ChatCompletionsClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("model API key not set".into()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            vision_temperature: config.vision_temperature,
            text_temperature: config.text_temperature,
        })
    }

    async fn post(&self, model: &str, content: Value, temperature: f64) -> Result<String> {
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": content}],
            "temperature": temperature,
        });

        debug!("Requesting completion from {} with model {}", self.api_url, model);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            let message = error_message(&parsed).unwrap_or(text);
            return Err(Error::ProviderUnavailable(format!("API error {}: {}", status, message)));
        }

        extract_completion(&parsed)
            .ok_or_else(|| Error::ProviderUnavailable(format!("model {} returned no content", model)))
    }
}

#[async_trait]
impl TextModel for ChatCompletionsClient {
    async fn complete(&self, prompt: &str, model_id: &str) -> Result<String> {
        self.post(model_id, json!(prompt), self.text_temperature).await
    }
}

#[async_trait]
impl VisionModel for ChatCompletionsClient {
    async fn analyze(&self, image: &MediaBlob, prompt: &str, model_id: &str) -> Result<String> {
        let content = json!([
            {"type": "text", "text": prompt},
            {"type": "image_url", "image_url": {"url": image.to_data_url()}},
        ]);
        self.post(model_id, content, self.vision_temperature).await
    }
}

/// Message content of the first choice. Some gateways nest the payload under `data`.
pub fn extract_completion(body: &Value) -> Option<String> {
    [&body["choices"][0]["message"]["content"], &body["data"]["choices"][0]["message"]["content"]]
        .into_iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn error_message(body: &Value) -> Option<String> {
    [&body["error"]["message"], &body["message"], &body["msg"]]
        .into_iter()
        .find_map(|v| v.as_str())
        .map(String::from)
}

//! `ModelService` over the Gemini `generateContent` REST API.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{error, info};

use super::prompts::build_translation_prompt;
use super::response::{parse_json_text, parse_string_map};
use super::types::{StringMap, TransformExtras};
use super::ModelService;
use crate::artifact::{extension_for_mime, Artifact};
use crate::config::ModelConfig;
use crate::error::ModelError;

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    config: ModelConfig,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(config: ModelConfig, api_key: impl Into<String>) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Read the API key from the environment variable named in the config.
    pub fn from_env(config: ModelConfig) -> Result<Self, ModelError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ModelError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    format!(
                        "timeout after {}s calling model '{}'",
                        self.config.timeout_secs, model
                    )
                } else {
                    format!("request to model '{}' failed: {}", model, e)
                };
                error!("{}", msg);
                ModelError::Transport(msg)
            })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            let msg = format!("{} from model '{}' - {}", status, model, truncate(&body_text, 1024));
            error!("{}", msg);
            return Err(ModelError::Transport(msg));
        }

        serde_json::from_str(&body_text).map_err(|e| {
            let msg = format!("response envelope is not JSON: {}", e);
            error!("{}", msg);
            ModelError::MalformedResponse(msg)
        })
    }
}

impl ModelService for GeminiClient {
    async fn transform_image(
        &self,
        image: &Artifact,
        prompt: &str,
        extras: &TransformExtras,
    ) -> Result<Artifact, ModelError> {
        info!(
            "Transforming {} with model '{}'",
            image.filename(),
            self.config.image_model
        );
        let body = build_transform_body(image, prompt, extras);
        let response = self.generate_content(&self.config.image_model, &body).await?;
        extract_image(&response, "edit")
    }

    async fn generate_image(&self, prompt: &str) -> Result<Artifact, ModelError> {
        info!("Generating image with model '{}'", self.config.image_model);
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]}
        });
        let response = self.generate_content(&self.config.image_model, &body).await?;
        extract_image(&response, "generation")
    }

    async fn analyze_image(
        &self,
        image: &Artifact,
        instruction: &str,
    ) -> Result<serde_json::Value, ModelError> {
        let body = serde_json::json!({
            "contents": [{"parts": [inline_part(image), {"text": instruction}]}],
            "generationConfig": {"responseMimeType": "application/json"}
        });
        let response = self.generate_content(&self.config.text_model, &body).await?;
        let text = extract_text(&response)?;
        parse_json_text(&text)
    }

    async fn translate(
        &self,
        strings: &StringMap,
        target_language: &str,
    ) -> Result<StringMap, ModelError> {
        info!(
            "Translating {} strings to '{}'",
            strings.len(),
            target_language
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": build_translation_prompt(strings, target_language)}]}],
            "generationConfig": {"responseMimeType": "application/json"}
        });
        let response = self.generate_content(&self.config.text_model, &body).await?;
        let text = extract_text(&response)?;
        parse_string_map(parse_json_text(&text)?)
    }
}

fn inline_part(artifact: &Artifact) -> serde_json::Value {
    serde_json::json!({
        "inlineData": {
            "mimeType": artifact.mime_type(),
            "data": STANDARD.encode(artifact.bytes())
        }
    })
}

/// Parts order: source image, optional reference (style image or mask), prompt.
fn build_transform_body(
    image: &Artifact,
    prompt: &str,
    extras: &TransformExtras,
) -> serde_json::Value {
    let mut parts = vec![inline_part(image)];
    if let Some(second) = &extras.second_image {
        parts.push(inline_part(second));
    }
    if let Some(mask) = &extras.mask {
        parts.push(inline_part(mask));
    }
    parts.push(serde_json::json!({ "text": prompt }));

    serde_json::json!({
        "contents": [{"parts": parts}],
        "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]}
    })
}

fn block_reason(response: &serde_json::Value) -> Option<ModelError> {
    let reason = response["promptFeedback"]["blockReason"].as_str()?;
    let detail = response["promptFeedback"]["blockReasonMessage"]
        .as_str()
        .unwrap_or("");
    let msg = format!("Request was blocked. Reason: {}. {}", reason, detail)
        .trim_end()
        .to_string();
    error!("{}", msg);
    Some(ModelError::Refused(msg))
}

fn collect_text(response: &serde_json::Value) -> String {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Pull the first inline image out of a `generateContent` response.
fn extract_image(response: &serde_json::Value, context: &str) -> Result<Artifact, ModelError> {
    if let Some(blocked) = block_reason(response) {
        return Err(blocked);
    }

    let inline = response["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| {
            parts.iter().find_map(|p| {
                let data = p.get("inlineData").or_else(|| p.get("inline_data"))?;
                let bytes = data["data"].as_str()?;
                let mime = data
                    .get("mimeType")
                    .or_else(|| data.get("mime_type"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("image/png");
                Some((bytes, mime))
            })
        });

    if let Some((data, mime)) = inline {
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| ModelError::MalformedResponse(format!("image payload is not base64: {}", e)))?;
        info!("Received {} image for {} ({} bytes)", mime, context, bytes.len());
        let filename = format!("{}.{}", context, extension_for_mime(mime));
        return Ok(Artifact::new(bytes, filename, mime));
    }

    if let Some(reason) = response["candidates"][0]["finishReason"].as_str() {
        if reason != "STOP" {
            let msg = format!(
                "Image generation for {} stopped unexpectedly. Reason: {}. This often relates to safety settings.",
                context, reason
            );
            error!("{}", msg);
            return Err(ModelError::Refused(msg));
        }
    }

    let text = collect_text(response);
    let msg = if text.trim().is_empty() {
        format!(
            "The model did not return an image for the {}. This can happen due to safety filters or if the request is too complex; try rephrasing the prompt.",
            context
        )
    } else {
        format!(
            "The model did not return an image for the {}. The model responded with text: \"{}\"",
            context,
            text.trim()
        )
    };
    error!("{}", msg);
    Err(ModelError::EmptyResult(msg))
}

fn extract_text(response: &serde_json::Value) -> Result<String, ModelError> {
    if let Some(blocked) = block_reason(response) {
        return Err(blocked);
    }
    let text = collect_text(response);
    if text.trim().is_empty() {
        return Err(ModelError::EmptyResult(
            "The model returned no text".to_string(),
        ));
    }
    Ok(text)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

//! Gemini adapter.
//!
//! Authentication is a `key=` query parameter rather than a bearer header.
//! Text streaming uses `:streamGenerateContent?alt=sse`, which delivers the
//! same candidate objects as the blocking endpoint, one per SSE event.

use super::{expect_success, http_client, post_json};
use crate::error::GatewayError;
use crate::streaming::sse_json_stream;
use crate::traits::ModelAdapter;
use crate::types::{
    AiProvider, GeneratedImage, ImageGenerationRequest, ImageGenerationResponse, MessageRole,
    Modality, TextChunk, TextGenerationRequest, TextGenerationResponse, TextStream,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;

pub struct GeminiAdapter {
    api_key: Option<SecretString>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            api_key,
            base_url: crate::defaults::base_url::GEMINI.to_string(),
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn key(&self) -> Result<&str, GatewayError> {
        self.ensure_configured()?;
        Ok(self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .unwrap_or_default())
    }

    fn resolve_model(
        &self,
        requested: Option<&str>,
        modality: Modality,
    ) -> Result<String, GatewayError> {
        match requested {
            Some(model) => {
                self.check_model(model, modality)?;
                Ok(model.to_string())
            }
            None => self
                .default_model(modality)
                .ok_or_else(|| self.unsupported(modality)),
        }
    }

    /// Build the `generateContent` body. Gemini has no system role in
    /// `contents`; the instruction rides in a dedicated field, and assistant
    /// turns map to the `model` role.
    fn text_body(request: &TextGenerationRequest) -> Value {
        let contents: Vec<Value> = if request.messages.is_empty() {
            vec![json!({"role": "user", "parts": [{"text": request.prompt}]})]
        } else {
            request
                .messages
                .iter()
                .map(|message| {
                    let role = match message.role {
                        MessageRole::Assistant => "model",
                        _ => "user",
                    };
                    json!({"role": role, "parts": [{"text": message.content}]})
                })
                .collect()
        };

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                "maxOutputTokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            },
        });
        if let Some(system) = &request.system_instruction {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        body
    }

    fn parse_text_response(
        &self,
        model: &str,
        value: &Value,
    ) -> Result<TextGenerationResponse, GatewayError> {
        let candidate = value
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| GatewayError::Parse("gemini response carried no candidates".to_string()))?;

        Ok(TextGenerationResponse {
            content: candidate
                .pointer("/content/parts/0/text")
                .and_then(|t| t.as_str())
                .unwrap_or("")
                .to_string(),
            provider: self.provider(),
            model: model.to_string(),
            usage: decode_gemini_usage(value),
            finish_reason: candidate
                .get("finishReason")
                .and_then(|r| r.as_str())
                .map(str::to_string),
        })
    }

    /// Nearest whole aspect ratio for the requested geometry.
    fn aspect_ratio(request: &ImageGenerationRequest) -> String {
        if let Some(ratio) = request.aspect_ratio.as_deref() {
            return ratio.to_string();
        }
        let width = request.width.unwrap_or(1024);
        let height = request.height.unwrap_or(1024);
        if width > height {
            format!("{}:1", (width as f64 / height as f64).round() as u32)
        } else if height > width {
            format!("1:{}", (height as f64 / width as f64).round() as u32)
        } else {
            "1:1".to_string()
        }
    }

    fn inline_images(value: &Value) -> Vec<GeneratedImage> {
        let mut images = Vec::new();
        let candidates = value
            .get("candidates")
            .and_then(|c| c.as_array())
            .cloned()
            .unwrap_or_default();
        for candidate in &candidates {
            let parts = candidate
                .pointer("/content/parts")
                .and_then(|p| p.as_array())
                .cloned()
                .unwrap_or_default();
            for part in &parts {
                if let Some(inline) = part.get("inlineData") {
                    if let Some(data) = inline.get("data").and_then(|d| d.as_str()) {
                        let mime = inline
                            .get("mimeType")
                            .and_then(|m| m.as_str())
                            .unwrap_or("image/png");
                        images.push(GeneratedImage {
                            url: None,
                            b64: Some(format!("data:{mime};base64,{data}")),
                        });
                    }
                }
            }
        }
        images
    }
}

/// Usage lives under `usageMetadata` with Gemini-specific field names.
fn decode_gemini_usage(value: &Value) -> Option<crate::types::TokenUsage> {
    let meta = value.get("usageMetadata")?;
    Some(crate::types::TokenUsage {
        input_tokens: meta
            .get("promptTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        output_tokens: meta
            .get("candidatesTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        total_tokens: meta
            .get("totalTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
    })
}

/// Decode one streamed candidate object into zero or more chunks.
fn decode_gemini_chunk(value: &Value) -> Vec<TextChunk> {
    let mut chunks = Vec::with_capacity(1);
    if let Some(text) = value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
    {
        if !text.is_empty() {
            chunks.push(TextChunk::delta(text));
        }
    }
    let finished = value
        .pointer("/candidates/0/finishReason")
        .is_some_and(|r| !r.is_null());
    if finished {
        chunks.push(TextChunk::finished(decode_gemini_usage(value)));
    }
    chunks
}

#[async_trait]
impl ModelAdapter for GeminiAdapter {
    fn provider(&self) -> AiProvider {
        AiProvider::Gemini
    }

    fn supports(&self, _modality: Modality) -> bool {
        true
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn supported_models(&self, modality: Modality) -> Vec<String> {
        let models: &[&str] = match modality {
            Modality::Text => &[
                "gemini-2.0-flash-exp",
                "gemini-1.5-pro",
                "gemini-1.5-flash",
                "gemini-pro",
            ],
            Modality::Image => &["imagen-3.0-generate-001", "imagen-2"],
            Modality::Audio => &["gemini-2.0-flash-exp"],
            Modality::Video => &["veo-2"],
        };
        models.iter().map(|m| m.to_string()).collect()
    }

    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Text)?;
        let body = Self::text_body(request);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, key
        );
        let value = post_json(self.provider(), self.client.post(url), &body).await?;
        self.parse_text_response(&model, &value)
    }

    async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextStream, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Text)?;
        let body = Self::text_body(request);

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, key
        );
        let response = self.client.post(url).json(&body).send().await?;
        let response = expect_success(self.provider(), response).await?;

        let out = async_stream::stream! {
            let mut events = sse_json_stream(response, "gemini");
            while let Some(item) = events.next().await {
                match item {
                    Ok(value) => {
                        for chunk in decode_gemini_chunk(&value) {
                            let done = chunk.done;
                            yield Ok(chunk);
                            if done {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };
        Ok(Box::pin(out))
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Image)?;

        let body = json!({
            "contents": [{"parts": [{"text": request.prompt}]}],
            "generationConfig": {
                "imageConfig": {"aspectRatio": Self::aspect_ratio(request)},
            },
        });
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, key
        );

        // One image per call; repeat for the remaining count. A failed extra
        // call degrades the count rather than failing the response.
        let requested = request.number_of_images.unwrap_or(1).max(1) as usize;
        let value = post_json(self.provider(), self.client.post(&url), &body).await?;
        let mut images = Self::inline_images(&value);

        while images.len() < requested {
            match post_json(self.provider(), self.client.post(&url), &body).await {
                Ok(value) => {
                    let mut more = Self::inline_images(&value);
                    if more.is_empty() {
                        break;
                    }
                    images.append(&mut more);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "additional gemini image call failed");
                    break;
                }
            }
        }

        images.truncate(requested);
        let count = images.len() as u32;
        Ok(ImageGenerationResponse {
            images,
            provider: self.provider(),
            model,
            images_generated: Some(count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, TokenUsage};

    #[test]
    fn assistant_turns_map_to_model_role() {
        let request = TextGenerationRequest::new("ignored").with_messages(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);
        let body = GeminiAdapter::text_body(&request);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn system_instruction_rides_outside_contents() {
        let request = TextGenerationRequest::new("hi").with_system_instruction("be brief");
        let body = GeminiAdapter::text_body(&request);
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "be brief"
        );
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn stream_chunk_decoding_handles_finish() {
        let value = json!({
            "candidates": [{
                "content": {"parts": [{"text": "done"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 2, "candidatesTokenCount": 3, "totalTokenCount": 5}
        });
        let chunks = decode_gemini_chunk(&value);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], TextChunk::delta("done"));
        assert!(chunks[1].done);
        assert_eq!(
            chunks[1].usage,
            Some(TokenUsage {
                input_tokens: 2,
                output_tokens: 3,
                total_tokens: 5,
            })
        );
    }

    #[test]
    fn aspect_ratio_derived_from_geometry() {
        let mut request = ImageGenerationRequest::new("p");
        request.width = Some(2048);
        request.height = Some(1024);
        assert_eq!(GeminiAdapter::aspect_ratio(&request), "2:1");
        assert_eq!(
            GeminiAdapter::aspect_ratio(&ImageGenerationRequest::new("p")),
            "1:1"
        );
    }
}

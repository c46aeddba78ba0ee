//! Qwen (DashScope) adapter.
//!
//! Text goes through DashScope's OpenAI-compatible surface. Image generation
//! is an asynchronous task API: submit with `X-DashScope-Async: enable`,
//! then poll `tasks/{task_id}` until SUCCEEDED/FAILED or the attempt ceiling.

use super::{expect_success, http_client, openai_compat, post_json};
use crate::error::GatewayError;
use crate::streaming::text_chunk_stream;
use crate::traits::ModelAdapter;
use crate::types::{
    AiProvider, GeneratedImage, ImageGenerationRequest, ImageGenerationResponse, Modality,
    TextGenerationRequest, TextGenerationResponse, TextStream,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;

pub struct QwenAdapter {
    api_key: Option<SecretString>,
    base_url: String,
    tasks_base_url: String,
    client: reqwest::Client,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl QwenAdapter {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            api_key,
            base_url: crate::defaults::base_url::QWEN.to_string(),
            tasks_base_url: crate::defaults::base_url::QWEN_TASKS.to_string(),
            client: http_client(),
            poll_interval: crate::defaults::poll::INTERVAL,
            poll_max_attempts: crate::defaults::poll::MAX_ATTEMPTS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_tasks_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.tasks_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the polling schedule. Tests shorten the interval so the
    /// attempt ceiling is reachable in wall-clock milliseconds.
    pub fn with_poll_schedule(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_max_attempts = max_attempts;
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

    /// Map the requested geometry to a DashScope `{w}*{h}` size string.
    /// Aspect ratio wins over explicit width/height.
    fn image_size(request: &ImageGenerationRequest) -> String {
        if let Some(ratio) = request.aspect_ratio.as_deref() {
            return match ratio {
                "16:9" => "1280*720".to_string(),
                "9:16" => "720*1280".to_string(),
                _ => "1024*1024".to_string(),
            };
        }
        format!(
            "{}*{}",
            request.width.unwrap_or(1024),
            request.height.unwrap_or(1024)
        )
    }

    /// Poll the task endpoint until a terminal status. The attempt ceiling
    /// makes the worst-case wait `max_attempts * interval`.
    async fn poll_image_task(
        &self,
        key: &str,
        task_id: &str,
        model: String,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        let task_url = format!("{}/tasks/{}", self.tasks_base_url, task_id);

        for attempt in 1..=self.poll_max_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = self.client.get(&task_url).bearer_auth(key).send().await?;
            let response = expect_success(self.provider(), response).await?;
            let value: serde_json::Value = response.json().await?;

            let status = value
                .pointer("/output/task_status")
                .and_then(|s| s.as_str())
                .unwrap_or("");
            tracing::debug!(task_id, attempt, status, "image task poll");

            match status {
                "SUCCEEDED" => {
                    let images: Vec<GeneratedImage> = value
                        .pointer("/output/results")
                        .and_then(|r| r.as_array())
                        .map(|results| {
                            results
                                .iter()
                                .map(|result| GeneratedImage {
                                    url: result
                                        .get("url")
                                        .and_then(|u| u.as_str())
                                        .map(str::to_string),
                                    b64: result
                                        .get("b64_image")
                                        .and_then(|b| b.as_str())
                                        .map(str::to_string),
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    let count = images.len() as u32;
                    return Ok(ImageGenerationResponse {
                        images,
                        provider: self.provider(),
                        model,
                        images_generated: Some(count),
                    });
                }
                "FAILED" => {
                    let message = value
                        .pointer("/output/message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("unknown error");
                    return Err(GatewayError::vendor(
                        self.provider(),
                        format!("image task failed: {message}"),
                    ));
                }
                _ => {}
            }
        }

        Err(GatewayError::Timeout(format!(
            "qwen image task {task_id} not finished after {} polls",
            self.poll_max_attempts
        )))
    }
}

#[async_trait]
impl ModelAdapter for QwenAdapter {
    fn provider(&self) -> AiProvider {
        AiProvider::Qwen
    }

    fn supports(&self, modality: Modality) -> bool {
        !matches!(modality, Modality::Video)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn supported_models(&self, modality: Modality) -> Vec<String> {
        let models: &[&str] = match modality {
            Modality::Text => &["qwen-max", "qwen-plus", "qwen-turbo"],
            Modality::Image => &["wanx-v1"],
            Modality::Audio => &["paraformer-zh"],
            Modality::Video => &[],
        };
        models.iter().map(|m| m.to_string()).collect()
    }

    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Text)?;
        let body = openai_compat::chat_body(request, &model, false);

        let url = format!("{}/chat/completions", self.base_url);
        let value = post_json(
            self.provider(),
            self.client.post(url).bearer_auth(key),
            &body,
        )
        .await?;
        openai_compat::parse_chat_response(self.provider(), &model, &value)
    }

    async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextStream, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Text)?;
        let body = openai_compat::chat_body(request, &model, true);

        let url = format!("{}/chat/completions", self.base_url);
        let response = self.client.post(url).bearer_auth(key).json(&body).send().await?;
        let response = expect_success(self.provider(), response).await?;
        Ok(text_chunk_stream(response, "qwen"))
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Image)?;

        let body = json!({
            "model": model,
            "input": {
                "prompt": request.prompt,
                "negative_prompt": request.negative_prompt,
            },
            "parameters": {
                "size": Self::image_size(request),
                "n": request.number_of_images.unwrap_or(1),
            },
        });

        let submit_url = format!(
            "{}/services/aigc/text2image/image-synthesis",
            self.tasks_base_url
        );
        let response = self
            .client
            .post(submit_url)
            .bearer_auth(key)
            .header("X-DashScope-Async", "enable")
            .json(&body)
            .send()
            .await?;
        let response = expect_success(self.provider(), response).await?;
        let value: serde_json::Value = response.json().await?;

        // DashScope reports submit-level errors with a string code field.
        if let Some(code) = value.get("code").and_then(|c| c.as_str()) {
            if code != "200" {
                let message = value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or(code);
                return Err(GatewayError::vendor(
                    self.provider(),
                    format!("image task submit rejected: {message}"),
                ));
            }
        }

        let task_id = value
            .pointer("/output/task_id")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                GatewayError::Parse("qwen image submit returned no task_id".to_string())
            })?
            .to_string();

        self.poll_image_task(key, &task_id, model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_wins_over_explicit_size() {
        let request = ImageGenerationRequest::new("a cat")
            .with_aspect_ratio("16:9");
        assert_eq!(QwenAdapter::image_size(&request), "1280*720");

        let mut request = ImageGenerationRequest::new("a cat");
        request.width = Some(512);
        request.height = Some(768);
        assert_eq!(QwenAdapter::image_size(&request), "512*768");

        assert_eq!(
            QwenAdapter::image_size(&ImageGenerationRequest::new("a cat")),
            "1024*1024"
        );
    }
}

//! Doubao (Volcengine Ark) adapter. Speaks the OpenAI-compatible protocol
//! for chat and images; audio endpoints are declared but not yet wired.

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

pub struct DoubaoAdapter {
    api_key: Option<SecretString>,
    base_url: String,
    client: reqwest::Client,
}

impl DoubaoAdapter {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            api_key,
            base_url: crate::defaults::base_url::DOUBAO.to_string(),
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
}

#[async_trait]
impl ModelAdapter for DoubaoAdapter {
    fn provider(&self) -> AiProvider {
        AiProvider::Doubao
    }

    fn supports(&self, modality: Modality) -> bool {
        !matches!(modality, Modality::Video)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn supported_models(&self, modality: Modality) -> Vec<String> {
        let models: &[&str] = match modality {
            Modality::Text => &["doubao-pro-4k", "doubao-lite-4k"],
            Modality::Image => &["doubao-image"],
            Modality::Audio => &["doubao-tts"],
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
        Ok(text_chunk_stream(response, "doubao"))
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Image)?;

        let body = json!({
            "model": model,
            "prompt": request.prompt,
            "negative_prompt": request.negative_prompt,
            "width": request.width.unwrap_or(1024),
            "height": request.height.unwrap_or(1024),
            "n": request.number_of_images.unwrap_or(1),
        });

        let url = format!("{}/images/generations", self.base_url);
        let value = post_json(
            self.provider(),
            self.client.post(url).bearer_auth(key),
            &body,
        )
        .await?;

        // Ark answers with either a `data` or an `images` array depending on
        // the model family.
        let items = value
            .get("data")
            .or_else(|| value.get("images"))
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();
        let images: Vec<GeneratedImage> = items
            .iter()
            .map(|img| GeneratedImage {
                url: img
                    .get("url")
                    .or_else(|| img.get("image_url"))
                    .and_then(|u| u.as_str())
                    .map(str::to_string),
                b64: img
                    .get("b64_json")
                    .or_else(|| img.get("base64"))
                    .and_then(|b| b.as_str())
                    .map(str::to_string),
            })
            .collect();

        if images.is_empty() {
            return Err(GatewayError::vendor(
                self.provider(),
                "no images generated".to_string(),
            ));
        }

        let count = images.len() as u32;
        Ok(ImageGenerationResponse {
            images,
            provider: self.provider(),
            model,
            images_generated: Some(count),
        })
    }
}

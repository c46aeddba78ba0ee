//! OpenAI adapter: chat completions, DALL-E images, TTS, and Whisper STT.

use super::{expect_success, http_client, openai_compat, post_json};
use crate::error::GatewayError;
use crate::streaming::text_chunk_stream;
use crate::traits::ModelAdapter;
use crate::types::{
    AiProvider, AudioResponse, GeneratedImage, ImageGenerationRequest, ImageGenerationResponse,
    Modality, SpeechToTextRequest, TextGenerationRequest, TextGenerationResponse, TextStream,
    TextToSpeechRequest,
};
use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

pub struct OpenAiAdapter {
    api_key: Option<SecretString>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            api_key,
            base_url: crate::defaults::base_url::OPENAI.to_string(),
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
impl ModelAdapter for OpenAiAdapter {
    fn provider(&self) -> AiProvider {
        AiProvider::OpenAi
    }

    fn supports(&self, modality: Modality) -> bool {
        !matches!(modality, Modality::Video)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn supported_models(&self, modality: Modality) -> Vec<String> {
        let models: &[&str] = match modality {
            Modality::Text => &["gpt-4", "gpt-4-turbo", "gpt-3.5-turbo", "gpt-4o"],
            Modality::Image => &["dall-e-3", "dall-e-2"],
            Modality::Audio => &["tts-1", "tts-1-hd", "whisper-1"],
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
        Ok(text_chunk_stream(response, "openai"))
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
            "n": request.number_of_images.unwrap_or(1),
            "size": format!(
                "{}x{}",
                request.width.unwrap_or(1024),
                request.height.unwrap_or(1024)
            ),
            "quality": "standard",
        });

        let url = format!("{}/images/generations", self.base_url);
        let value = post_json(
            self.provider(),
            self.client.post(url).bearer_auth(key),
            &body,
        )
        .await?;

        let images: Vec<GeneratedImage> = value
            .get("data")
            .and_then(|d| d.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|img| GeneratedImage {
                        url: img.get("url").and_then(|u| u.as_str()).map(str::to_string),
                        b64: img
                            .get("b64_json")
                            .and_then(|b| b.as_str())
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let count = images.len() as u32;
        Ok(ImageGenerationResponse {
            images,
            provider: self.provider(),
            model,
            images_generated: Some(count),
        })
    }

    async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError> {
        let key = self.key()?;
        let model = self.resolve_model(request.model.as_deref(), Modality::Audio)?;

        let body = json!({
            "model": model,
            "input": request.text,
            "voice": request.voice.as_deref().unwrap_or("alloy"),
            "speed": request.speed.unwrap_or(1.0),
        });

        let url = format!("{}/audio/speech", self.base_url);
        let response = self.client.post(url).bearer_auth(key).json(&body).send().await?;
        let response = expect_success(self.provider(), response).await?;
        let audio = response.bytes().await?;

        Ok(AudioResponse {
            audio_url: None,
            audio_b64: Some(base64::engine::general_purpose::STANDARD.encode(&audio)),
            text: None,
            duration_secs: None,
            provider: self.provider(),
            model,
            confidence: None,
        })
    }

    async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError> {
        let key = self.key()?;
        let model = request.model.clone().unwrap_or_else(|| "whisper-1".to_string());

        let file = reqwest::multipart::Part::bytes(request.audio.data.clone())
            .file_name(request.audio.file_name.clone())
            .mime_str(&request.audio.mime_type)
            .map_err(|e| GatewayError::InvalidInput(format!("invalid audio mime type: {e}")))?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", model.clone());
        if let Some(language) = &request.language {
            form = form.text("language", language.clone());
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;
        let response = expect_success(self.provider(), response).await?;
        let value: serde_json::Value = response.json().await?;

        Ok(AudioResponse {
            audio_url: None,
            audio_b64: None,
            text: value.get("text").and_then(|t| t.as_str()).map(str::to_string),
            duration_secs: None,
            provider: self.provider(),
            model,
            confidence: Some(1.0),
        })
    }
}

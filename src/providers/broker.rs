//! Broker adapter.
//!
//! Instead of calling vendors directly, every operation is a JSON POST to
//! the broker's `/ai/*` routes with a bearer credential; vendor selection,
//! credentials, and fallback happen server-side. Responses arrive in the
//! `{code, message, data}` envelope with the already-normalized payload.

use super::{ApiEnvelope, http_client};
use crate::error::GatewayError;
use crate::streaming::text_chunk_stream;
use crate::types::{
    AudioResponse, ImageGenerationRequest, ImageGenerationResponse, SpeechToTextRequest,
    TextGenerationRequest, TextGenerationResponse, TextStream, TextToSpeechRequest,
    VideoGenerationRequest, VideoGenerationResponse,
};
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// The broker has no vendor identity of its own; errors it raises are
/// attributed to whichever vendor it reports, or surfaced as-is.
pub struct BrokerAdapter {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl BrokerAdapter {
    pub fn new(base_url: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str, GatewayError> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret())
            .ok_or_else(|| {
                GatewayError::AuthenticationRequired(
                    "Not logged in: a broker credential is required".to_string(),
                )
            })
    }

    fn route(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body and unwrap the response envelope.
    async fn post_enveloped<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, GatewayError> {
        let token = self.token()?;
        let response = self
            .client
            .post(self.route(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::AuthenticationRequired(
                "Broker rejected the credential (HTTP 401)".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http(format!(
                "Broker request failed: HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        let envelope: ApiEnvelope<T> = response.json().await?;
        envelope.into_data()
    }

    pub async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        self.post_enveloped("/ai/text/generate", &serde_json::to_value(request)?)
            .await
    }

    /// Streaming body is SSE; each event's payload may be either the
    /// OpenAI-compatible delta shape or the flat `{content, done, usage}`
    /// shape depending on the upstream vendor.
    pub async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextStream, GatewayError> {
        let token = self.token()?;
        let mut body = serde_json::to_value(request)?;
        body["stream"] = Value::Bool(true);

        let response = self
            .client
            .post(self.route("/ai/text/generate/stream"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::AuthenticationRequired(
                "Broker rejected the credential (HTTP 401)".to_string(),
            ));
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http(format!(
                "Broker stream request failed: HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        Ok(text_chunk_stream(response, "broker"))
    }

    pub async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        self.post_enveloped("/ai/image/generate", &serde_json::to_value(request)?)
            .await
    }

    pub async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError> {
        self.post_enveloped("/ai/audio/tts", &serde_json::to_value(request)?)
            .await
    }

    pub async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError> {
        // Raw audio travels base64-encoded inside the JSON body.
        let body = json!({
            "provider": request.provider,
            "model": request.model,
            "language": request.language,
            "audio": {
                "data": base64::engine::general_purpose::STANDARD.encode(&request.audio.data),
                "fileName": request.audio.file_name,
                "mimeType": request.audio.mime_type,
            },
        });
        self.post_enveloped("/ai/audio/stt", &body).await
    }

    pub async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoGenerationResponse, GatewayError> {
        self.post_enveloped("/ai/video/generate", &serde_json::to_value(request)?)
            .await
    }
}

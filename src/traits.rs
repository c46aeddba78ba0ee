//! The vendor adapter contract
//!
//! One implementing type per vendor, selected at runtime through the
//! registry. Adapters are stateless except for credentials: they translate
//! the normalized request into the vendor's wire payload, make exactly one
//! outbound call per invocation (plus bounded status polls for async-task
//! vendors), and parse the vendor response back into the normalized shape.

use crate::error::GatewayError;
use crate::types::{
    AiProvider, AudioResponse, ImageGenerationRequest, ImageGenerationResponse, Modality,
    SpeechToTextRequest, TextGenerationRequest, TextGenerationResponse, TextStream,
    TextToSpeechRequest, VideoGenerationRequest, VideoGenerationResponse,
};
use async_trait::async_trait;

#[async_trait]
pub trait ModelAdapter: Send + Sync {
    fn provider(&self) -> AiProvider;

    /// Whether this adapter declares support for a modality. Static per
    /// adapter; configuration state is a separate question.
    fn supports(&self, modality: Modality) -> bool;

    /// Whether credentials are present and valid-shaped.
    fn is_configured(&self) -> bool;

    /// Models this adapter recognizes for a modality. An empty list means the
    /// adapter accepts any model string for that modality.
    fn supported_models(&self, modality: Modality) -> Vec<String>;

    /// The adapter's own default model for a modality.
    fn default_model(&self, modality: Modality) -> Option<String> {
        crate::defaults::default_model(self.provider(), modality).map(str::to_string)
    }

    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        let _ = request;
        Err(self.unsupported(Modality::Text))
    }

    async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextStream, GatewayError> {
        let _ = request;
        Err(self.unsupported(Modality::Text))
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        let _ = request;
        Err(self.unsupported(Modality::Image))
    }

    async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError> {
        let _ = request;
        Err(self.unsupported(Modality::Audio))
    }

    async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError> {
        let _ = request;
        Err(self.unsupported(Modality::Audio))
    }

    async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoGenerationResponse, GatewayError> {
        let _ = request;
        Err(self.unsupported(Modality::Video))
    }

    /// Error for an operation this adapter does not implement.
    fn unsupported(&self, modality: Modality) -> GatewayError {
        GatewayError::vendor(
            self.provider(),
            format!("{} generation not supported", modality),
        )
    }

    /// Reject a caller-pinned model outside the adapter's known list.
    fn check_model(&self, model: &str, modality: Modality) -> Result<(), GatewayError> {
        let known = self.supported_models(modality);
        if !known.is_empty() && !known.iter().any(|m| m == model) {
            return Err(GatewayError::UnsupportedModel {
                provider: self.provider(),
                model: model.to_string(),
            });
        }
        Ok(())
    }

    /// Error unless credentials are configured.
    fn ensure_configured(&self) -> Result<(), GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::Configuration(format!(
                "API key not configured for provider: {}",
                self.provider()
            )));
        }
        Ok(())
    }
}

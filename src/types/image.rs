//! Image generation request/response types

use super::common::AiProvider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AiProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "negativePrompt")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Preferred aspect ratio, e.g. "1:1", "16:9". Takes precedence over
    /// width/height where the vendor only supports fixed sizes.
    #[serde(skip_serializing_if = "Option::is_none", rename = "aspectRatio")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "numberOfImages")]
    pub number_of_images: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: AiProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(aspect_ratio.into());
        self
    }

    pub fn with_number_of_images(mut self, n: u32) -> Self {
        self.number_of_images = Some(n);
        self
    }
}

/// One generated image, delivered as a URL, base64 data, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "base64", alias = "b64_json")]
    pub b64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    pub images: Vec<GeneratedImage>,
    pub provider: AiProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "imagesGenerated")]
    pub images_generated: Option<u32>,
}

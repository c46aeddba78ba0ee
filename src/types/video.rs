//! Video generation request/response types

use super::common::AiProvider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AiProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "durationSecs")]
    pub duration_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl VideoGenerationRequest {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Completed,
    Processing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenerationResponse {
    #[serde(skip_serializing_if = "Option::is_none", rename = "videoUrl")]
    pub video_url: Option<String>,
    /// Vendor task id, set while an asynchronous generation is in flight.
    #[serde(skip_serializing_if = "Option::is_none", rename = "videoId")]
    pub video_id: Option<String>,
    pub status: VideoStatus,
    pub provider: AiProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "durationSecs")]
    pub duration_secs: Option<u32>,
}

//! Audio (TTS / STT) request/response types

use super::common::AiProvider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextToSpeechRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AiProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
}

impl TextToSpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_provider(mut self, provider: AiProvider) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// Raw audio input for speech-to-text.
#[derive(Debug, Clone)]
pub struct AudioSource {
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl AudioSource {
    pub fn new(data: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechToTextRequest {
    pub provider: Option<AiProvider>,
    pub model: Option<String>,
    pub audio: AudioSource,
    pub language: Option<String>,
}

impl SpeechToTextRequest {
    pub fn new(audio: AudioSource) -> Self {
        Self {
            provider: None,
            model: None,
            audio,
            language: None,
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
}

/// Normalized audio result. TTS fills `audio_url`/`audio_b64`; STT fills
/// `text` and optionally `confidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioResponse {
    #[serde(skip_serializing_if = "Option::is_none", rename = "audioUrl")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "audioBase64")]
    pub audio_b64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "durationSecs",
        alias = "duration"
    )]
    pub duration_secs: Option<f32>,
    pub provider: AiProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

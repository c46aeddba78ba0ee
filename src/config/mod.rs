//! Routing configuration
//!
//! `UserAIConfig` decides which mode generation runs in (broker-routed or
//! direct-to-vendor), which provider/model is preferred per modality, and
//! whether failed attempts fall back to other configured vendors.

mod resolver;
mod store;

pub use resolver::ConfigResolver;
pub use store::{
    BrokerConfigStore, ConfigStore, CredentialStore, MemoryConfigStore, MemoryCredentialStore,
};

use crate::types::{AiProvider, Modality};
use serde::{Deserialize, Serialize};

/// How generation calls are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Calls are proxied through a trusted broker that holds vendor
    /// credentials centrally.
    Broker,
    /// Calls go straight to vendors using locally held credentials.
    Direct,
}

/// Resolved routing configuration.
///
/// Loaded at session start and replaced wholesale on update; the orchestrator
/// always reads the current value through the resolver, never caching it
/// across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAIConfig {
    pub mode: GenerationMode,
    #[serde(skip_serializing_if = "Option::is_none", rename = "textProvider")]
    pub text_provider: Option<AiProvider>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "textModel")]
    pub text_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "imageProvider")]
    pub image_provider: Option<AiProvider>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "imageModel")]
    pub image_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "audioProvider")]
    pub audio_provider: Option<AiProvider>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "audioModel")]
    pub audio_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "videoProvider")]
    pub video_provider: Option<AiProvider>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "videoModel")]
    pub video_model: Option<String>,
    /// `None` means "not set here"; absence never overrides a stored choice.
    #[serde(skip_serializing_if = "Option::is_none", rename = "enableFallback")]
    pub enable_fallback: Option<bool>,
}

impl Default for UserAIConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Broker,
            text_provider: Some(AiProvider::Gemini),
            text_model: Some("gemini-2.0-flash-exp".to_string()),
            image_provider: Some(AiProvider::Gemini),
            image_model: Some("imagen-3.0-generate-001".to_string()),
            audio_provider: None,
            audio_model: None,
            video_provider: None,
            video_model: None,
            enable_fallback: Some(true),
        }
    }
}

impl UserAIConfig {
    /// Whether failed attempts fall back to other configured vendors.
    /// Defaults to enabled when never set.
    pub fn fallback_enabled(&self) -> bool {
        self.enable_fallback.unwrap_or(true)
    }

    /// Configured preferred provider for a modality, if any.
    pub fn preferred_provider(&self, modality: Modality) -> Option<AiProvider> {
        match modality {
            Modality::Text => self.text_provider,
            Modality::Image => self.image_provider,
            Modality::Audio => self.audio_provider,
            Modality::Video => self.video_provider,
        }
    }

    /// Configured preferred model for a modality, if any.
    pub fn preferred_model(&self, modality: Modality) -> Option<&str> {
        match modality {
            Modality::Text => self.text_model.as_deref(),
            Modality::Image => self.image_model.as_deref(),
            Modality::Audio => self.audio_model.as_deref(),
            Modality::Video => self.video_model.as_deref(),
        }
    }

    /// Merge a loaded (possibly partial) config over this one. Loaded values
    /// win; missing loaded values keep the current ones. Mode is sticky: a
    /// merge never changes it implicitly.
    pub fn merged_with(&self, loaded: UserAIConfig) -> UserAIConfig {
        UserAIConfig {
            mode: self.mode,
            text_provider: loaded.text_provider.or(self.text_provider),
            text_model: loaded.text_model.or_else(|| self.text_model.clone()),
            image_provider: loaded.image_provider.or(self.image_provider),
            image_model: loaded.image_model.or_else(|| self.image_model.clone()),
            audio_provider: loaded.audio_provider.or(self.audio_provider),
            audio_model: loaded.audio_model.or_else(|| self.audio_model.clone()),
            video_provider: loaded.video_provider.or(self.video_provider),
            video_model: loaded.video_model.or_else(|| self.video_model.clone()),
            enable_fallback: loaded.enable_fallback.or(self.enable_fallback),
        }
    }
}

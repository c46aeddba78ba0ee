//! Common types shared across modalities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An external generation backend with its own wire protocol and credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    OpenAi,
    Qwen,
    Doubao,
}

impl AiProvider {
    /// All providers, in the fixed declaration order used for registry
    /// iteration and fallback candidate ordering.
    pub const ALL: [AiProvider; 4] = [
        AiProvider::Gemini,
        AiProvider::OpenAi,
        AiProvider::Qwen,
        AiProvider::Doubao,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Qwen => "qwen",
            Self::Doubao => "doubao",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            // "dashscope" is the vendor name for the qwen API surface.
            "qwen" | "dashscope" => Ok(Self::Qwen),
            "doubao" => Ok(Self::Doubao),
            other => Err(format!("Unknown provider: {other}")),
        }
    }
}

/// Generation modality. `Audio` covers both text-to-speech and
/// speech-to-text; adapters that support one typically support both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Audio,
    Video,
}

impl Modality {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Normalized token accounting.
///
/// Deserialization accepts both the OpenAI-compatible snake_case names
/// (`prompt_tokens`/`completion_tokens`/`total_tokens`) and the broker's
/// camelCase names (`inputTokens`/`outputTokens`/`totalTokens`), so no usage
/// field is silently lost regardless of which wire shape produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    #[serde(default, alias = "prompt_tokens", alias = "inputTokens")]
    pub input_tokens: u32,
    #[serde(default, alias = "completion_tokens", alias = "outputTokens")]
    pub output_tokens: u32,
    #[serde(default, alias = "total_tokens", alias = "totalTokens")]
    pub total_tokens: u32,
}

impl TokenUsage {
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parse_accepts_aliases() {
        assert_eq!("gemini".parse::<AiProvider>(), Ok(AiProvider::Gemini));
        assert_eq!("dashscope".parse::<AiProvider>(), Ok(AiProvider::Qwen));
        assert_eq!("QWEN".parse::<AiProvider>(), Ok(AiProvider::Qwen));
        assert!("mystery".parse::<AiProvider>().is_err());
    }

    #[test]
    fn usage_accepts_both_wire_conventions() {
        let openai: TokenUsage = serde_json::from_value(serde_json::json!({
            "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15
        }))
        .unwrap();
        let broker: TokenUsage = serde_json::from_value(serde_json::json!({
            "inputTokens": 10, "outputTokens": 5, "totalTokens": 15
        }))
        .unwrap();
        assert_eq!(openai, broker);
        assert_eq!(openai, TokenUsage::new(10, 5));
    }
}

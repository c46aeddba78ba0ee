//! Text generation request/response types

use super::common::{AiProvider, ChatMessage, TokenUsage};
use crate::error::GatewayError;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A text generation request. Immutable after construction; the orchestrator
/// clones and adjusts `provider`/`model` when dispatching to a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextGenerationRequest {
    /// Explicit vendor override. `None` uses the configured preference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AiProvider>,
    /// Explicit model override. `None` uses the configured or default model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    pub system_instruction: Option<String>,
    /// Optional conversation history. When non-empty, `prompt` is not sent as
    /// a separate user turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxTokens")]
    pub max_tokens: Option<u32>,
}

impl TextGenerationRequest {
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

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Normalized text generation result. `provider` and `model` name the adapter
/// and model that actually produced the content, which after fallback may
/// differ from the request's preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextGenerationResponse {
    pub content: String,
    pub provider: AiProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// An incremental unit of a streaming text response.
///
/// Chunks for one logical call are strictly ordered; the terminal chunk
/// (`done == true`) is emitted exactly once per call that reaches completion
/// and is the only chunk that may carry usage accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl TextChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            usage: None,
        }
    }

    pub fn finished(usage: Option<TokenUsage>) -> Self {
        Self {
            content: String::new(),
            done: true,
            usage,
        }
    }
}

/// Boxed stream of text chunks produced by an adapter.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<TextChunk, GatewayError>> + Send>>;

/// Callback receiving chunks at the facade boundary.
pub type ChunkSink<'a> = &'a mut (dyn FnMut(TextChunk) + Send);

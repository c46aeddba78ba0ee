//! Shared chat wire code for OpenAI-compatible vendors
//!
//! openai, qwen (compatible mode), and doubao (ark) speak the same
//! `/chat/completions` protocol; only base URL and model catalogs differ.

use crate::error::GatewayError;
use crate::types::{AiProvider, TextGenerationRequest, TextGenerationResponse};
use serde_json::{Value, json};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Assemble the `messages` array: system instruction first, then either the
/// conversation history or the bare prompt as a single user turn.
pub(crate) fn chat_messages(request: &TextGenerationRequest) -> Vec<Value> {
    let mut messages = Vec::with_capacity(request.messages.len() + 2);
    if let Some(system) = &request.system_instruction {
        messages.push(json!({"role": "system", "content": system}));
    }
    if request.messages.is_empty() {
        messages.push(json!({"role": "user", "content": request.prompt}));
    } else {
        for message in &request.messages {
            messages.push(json!({"role": message.role, "content": message.content}));
        }
    }
    messages
}

pub(crate) fn chat_body(request: &TextGenerationRequest, model: &str, stream: bool) -> Value {
    let mut body = json!({
        "model": model,
        "messages": chat_messages(request),
        "temperature": request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    });
    if stream {
        body["stream"] = Value::Bool(true);
    }
    body
}

/// Parse a non-streaming `/chat/completions` response.
pub(crate) fn parse_chat_response(
    provider: AiProvider,
    model: &str,
    value: &Value,
) -> Result<TextGenerationResponse, GatewayError> {
    let choice = value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| GatewayError::Parse(format!("{provider} response carried no choices")))?;

    let content = choice
        .pointer("/message/content")
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(|r| r.as_str())
        .map(str::to_string);
    let usage = crate::streaming::decode_usage(value.get("usage"));

    Ok(TextGenerationResponse {
        content,
        provider,
        model: model.to_string(),
        usage,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, TokenUsage};

    #[test]
    fn prompt_becomes_single_user_turn() {
        let request = TextGenerationRequest::new("hello")
            .with_system_instruction("be brief");
        let messages = chat_messages(&request);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1], json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn history_replaces_prompt_turn() {
        let request = TextGenerationRequest::new("ignored").with_messages(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("again"),
        ]);
        let messages = chat_messages(&request);
        assert_eq!(messages.len(), 3);
        assert!(!messages.iter().any(|m| m["content"] == "ignored"));
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[test]
    fn parses_chat_response_with_usage() {
        let value = json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 1, "total_tokens": 10}
        });
        let response = parse_chat_response(AiProvider::OpenAi, "gpt-4", &value).unwrap();
        assert_eq!(response.content, "4");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage, Some(TokenUsage::new(9, 1)));
    }

    #[test]
    fn missing_choices_is_a_parse_error() {
        let err = parse_chat_response(AiProvider::Qwen, "qwen-max", &json!({})).unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }
}

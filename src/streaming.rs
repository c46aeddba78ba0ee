//! SSE streaming helpers
//!
//! Vendors deliver streaming text as server-sent events whose `data` payload
//! is one JSON object per event. This module turns a response body into a
//! stream of parsed JSON values (tolerating events split across network
//! reads, skipping heartbeats and `[DONE]` markers), and decodes the two
//! logical chunk families the gateway understands:
//!
//! - the OpenAI-compatible shape: `choices[0].delta.content` with a
//!   `finish_reason` completion signal, and
//! - the flat broker shape: `{content, done, usage}`.
//!
//! A literal `[DONE]` marker is informational only; completion is
//! authoritative only from `done == true` or a non-null `finish_reason`.

use crate::error::GatewayError;
use crate::types::{TextChunk, TextStream, TokenUsage};
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;

/// SSE `data` payloads that indicate end-of-stream and carry no content.
const DONE_MARKERS: [&str; 1] = ["[DONE]"];

pub(crate) type JsonSseStream =
    Pin<Box<dyn Stream<Item = Result<serde_json::Value, GatewayError>> + Send>>;

/// Parse a streaming response body into JSON values, one per SSE event.
///
/// `eventsource-stream` buffers until a full event is available, so events
/// split across network reads are reassembled before parsing. Empty payloads
/// and done markers are silently skipped, never treated as content.
pub(crate) fn sse_json_stream(response: reqwest::Response, label: &'static str) -> JsonSseStream {
    let out = async_stream::stream! {
        let mut events = response.bytes_stream().eventsource();

        while let Some(item) = events.next().await {
            let event = match item {
                Ok(ev) => ev,
                Err(e) => {
                    yield Err(GatewayError::Stream(format!("SSE stream error ({label}): {e}")));
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() || DONE_MARKERS.contains(&data) {
                continue;
            }

            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(value) => yield Ok(value),
                Err(e) => {
                    yield Err(GatewayError::Parse(format!(
                        "Failed to parse SSE JSON ({label}): {e}"
                    )));
                    return;
                }
            }
        }
    };

    Box::pin(out)
}

/// Decode one SSE JSON payload into zero or more text chunks.
///
/// Returns an empty vec for heartbeat events that carry neither content nor a
/// completion signal. An event carrying both a delta and a finish reason
/// yields the delta chunk first, then the terminal chunk.
pub(crate) fn decode_text_chunk(value: &serde_json::Value) -> Vec<TextChunk> {
    let mut chunks = Vec::with_capacity(1);
    let usage = decode_usage(value.get("usage"));

    if let Some(choice) = value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    {
        // OpenAI-compatible shape.
        if let Some(content) = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
        {
            if !content.is_empty() {
                chunks.push(TextChunk::delta(content));
            }
        }
        let finished = matches!(
            choice.get("finish_reason"),
            Some(reason) if !reason.is_null() && reason.as_str() != Some("null")
        );
        if finished {
            chunks.push(TextChunk::finished(usage));
        }
        return chunks;
    }

    // Flat broker shape.
    let content = value.get("content").and_then(|c| c.as_str()).unwrap_or("");
    let done = value.get("done").and_then(|d| d.as_bool()).unwrap_or(false);
    if !content.is_empty() {
        chunks.push(TextChunk::delta(content));
    }
    if done {
        chunks.push(TextChunk::finished(usage));
    }
    chunks
}

/// Map a wire usage object (either naming convention) to `TokenUsage`.
pub(crate) fn decode_usage(value: Option<&serde_json::Value>) -> Option<TokenUsage> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// Turn an SSE response into a chunk stream, ending after the first terminal
/// chunk so exactly one `done == true` is observed per completed call.
pub(crate) fn text_chunk_stream(response: reqwest::Response, label: &'static str) -> TextStream {
    let out = async_stream::stream! {
        let mut events = sse_json_stream(response, label);

        while let Some(item) = events.next().await {
            match item {
                Ok(value) => {
                    for chunk in decode_text_chunk(&value) {
                        let done = chunk.done;
                        yield Ok(chunk);
                        if done {
                            return;
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    };

    Box::pin(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_openai_compatible_delta_then_stop() {
        let delta = json!({"choices": [{"delta": {"content": "Hi"}}]});
        let chunks = decode_text_chunk(&delta);
        assert_eq!(chunks, vec![TextChunk::delta("Hi")]);

        let stop = json!({"choices": [{"delta": {}, "finish_reason": "stop"}]});
        let chunks = decode_text_chunk(&stop);
        assert_eq!(chunks, vec![TextChunk::finished(None)]);
    }

    #[test]
    fn null_finish_reason_is_not_completion() {
        let value = json!({"choices": [{"delta": {"content": "a"}, "finish_reason": null}]});
        let chunks = decode_text_chunk(&value);
        assert_eq!(chunks, vec![TextChunk::delta("a")]);
    }

    #[test]
    fn decodes_flat_shape_with_usage() {
        let value = json!({
            "content": "",
            "done": true,
            "usage": {"inputTokens": 3, "outputTokens": 7, "totalTokens": 10}
        });
        let chunks = decode_text_chunk(&value);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].done);
        assert_eq!(chunks[0].usage, Some(TokenUsage::new(3, 7)));
    }

    #[test]
    fn heartbeat_events_yield_nothing() {
        assert!(decode_text_chunk(&json!({})).is_empty());
        assert!(decode_text_chunk(&json!({"choices": [{"delta": {}}]})).is_empty());
        assert!(decode_text_chunk(&json!({"content": "", "done": false})).is_empty());
    }

    #[test]
    fn delta_and_finish_in_one_event_yield_both_chunks() {
        let value = json!({
            "choices": [{"delta": {"content": "end"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        });
        let chunks = decode_text_chunk(&value);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], TextChunk::delta("end"));
        assert!(chunks[1].done);
        assert_eq!(chunks[1].usage, Some(TokenUsage::new(1, 2)));
    }
}

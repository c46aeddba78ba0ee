//! Fallback behavior across real adapters and mock vendors
//!
//! Two mock servers stand in for gemini and openai; the orchestrator walks
//! them in candidate order. Request counts on each mock verify which vendors
//! were actually called.

use omnigen::providers::{GeminiAdapter, OpenAiAdapter};
use omnigen::{
    AdapterRegistry, AiProvider, ConfigResolver, GatewayError, GenerationMode,
    GenerationOrchestrator, Modality, ModelAdapter, TextGenerationRequest, UserAIConfig,
};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn key(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_string()))
}

fn direct_config(provider: AiProvider, model: &str, enable_fallback: bool) -> UserAIConfig {
    UserAIConfig {
        mode: GenerationMode::Direct,
        text_provider: Some(provider),
        text_model: Some(model.to_string()),
        enable_fallback: Some(enable_fallback),
        ..UserAIConfig::default()
    }
}

fn orchestrator(
    config: UserAIConfig,
    adapters: Vec<Arc<dyn ModelAdapter>>,
) -> GenerationOrchestrator {
    GenerationOrchestrator::new(
        Arc::new(ConfigResolver::new(config)),
        AdapterRegistry::from_adapters(adapters),
    )
}

fn openai_ok(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
    })
}

#[tokio::test]
async fn preferred_vendor_down_falls_back_with_default_model() {
    let gemini_server = MockServer::start().await;
    let openai_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&gemini_server)
        .await;

    // The fallback vendor must be asked for its own default model, never the
    // configured gemini model string.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok("rescued")))
        .expect(1)
        .mount(&openai_server)
        .await;

    let orch = orchestrator(
        direct_config(AiProvider::Gemini, "gemini-1.5-pro", true),
        vec![
            Arc::new(GeminiAdapter::new(key("gk")).with_base_url(gemini_server.uri())),
            Arc::new(OpenAiAdapter::new(key("ok")).with_base_url(openai_server.uri())),
        ],
    );

    let response = orch
        .generate_text(&TextGenerationRequest::new("hi"))
        .await
        .unwrap();
    assert_eq!(response.provider, AiProvider::OpenAi);
    assert_eq!(response.content, "rescued");
}

#[tokio::test]
async fn fallback_disabled_fails_without_touching_the_second_vendor() {
    let gemini_server = MockServer::start().await;
    let openai_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&gemini_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok("unreached")))
        .expect(0)
        .mount(&openai_server)
        .await;

    let orch = orchestrator(
        direct_config(AiProvider::Gemini, "gemini-1.5-pro", false),
        vec![
            Arc::new(GeminiAdapter::new(key("gk")).with_base_url(gemini_server.uri())),
            Arc::new(OpenAiAdapter::new(key("ok")).with_base_url(openai_server.uri())),
        ],
    );

    let err = orch
        .generate_text(&TextGenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Vendor { provider, .. } if provider == AiProvider::Gemini));
}

#[tokio::test]
async fn exhaustion_reports_all_attempted_vendors() {
    let gemini_server = MockServer::start().await;
    let openai_server = MockServer::start().await;

    for server in [&gemini_server, &openai_server] {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(1)
            .mount(server)
            .await;
    }

    let orch = orchestrator(
        direct_config(AiProvider::Gemini, "gemini-1.5-pro", true),
        vec![
            Arc::new(GeminiAdapter::new(key("gk")).with_base_url(gemini_server.uri())),
            Arc::new(OpenAiAdapter::new(key("ok")).with_base_url(openai_server.uri())),
        ],
    );

    let err = orch
        .generate_text(&TextGenerationRequest::new("hi"))
        .await
        .unwrap_err();
    match err {
        GatewayError::AllProvidersFailed {
            modality,
            attempted,
            last,
        } => {
            assert_eq!(modality, Modality::Text);
            assert_eq!(attempted, vec![AiProvider::Gemini, AiProvider::OpenAi]);
            assert!(last.contains("502"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn zero_configured_vendors_short_circuits_with_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let orch = orchestrator(
        direct_config(AiProvider::Gemini, "gemini-1.5-pro", true),
        vec![
            Arc::new(GeminiAdapter::new(None).with_base_url(server.uri())),
            Arc::new(OpenAiAdapter::new(None).with_base_url(server.uri())),
        ],
    );

    let err = orch
        .generate_text(&TextGenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::NoProviderConfigured {
            modality: Modality::Text
        }
    ));
}

#[tokio::test]
async fn explicit_provider_is_tried_before_the_configured_preference() {
    let gemini_server = MockServer::start().await;
    let openai_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "unreached"}]}, "finishReason": "STOP"}]
        })))
        .expect(0)
        .mount(&gemini_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok("explicit wins")))
        .expect(1)
        .mount(&openai_server)
        .await;

    let orch = orchestrator(
        direct_config(AiProvider::Gemini, "gemini-1.5-pro", true),
        vec![
            Arc::new(GeminiAdapter::new(key("gk")).with_base_url(gemini_server.uri())),
            Arc::new(OpenAiAdapter::new(key("ok")).with_base_url(openai_server.uri())),
        ],
    );

    let response = orch
        .generate_text(&TextGenerationRequest::new("hi").with_provider(AiProvider::OpenAi))
        .await
        .unwrap();
    assert_eq!(response.provider, AiProvider::OpenAi);
    assert_eq!(response.content, "explicit wins");
}

#[tokio::test]
async fn streaming_falls_back_when_the_first_vendor_rejects() {
    let gemini_server = MockServer::start().await;
    let openai_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(1)
        .mount(&gemini_server)
        .await;

    let sse = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"},\"finish_reason\":null}]}\n\n\
               data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&openai_server)
        .await;

    let orch = orchestrator(
        direct_config(AiProvider::Gemini, "gemini-1.5-pro", true),
        vec![
            Arc::new(GeminiAdapter::new(key("gk")).with_base_url(gemini_server.uri())),
            Arc::new(OpenAiAdapter::new(key("ok")).with_base_url(openai_server.uri())),
        ],
    );

    let mut chunks = Vec::new();
    let mut sink = |chunk: omnigen::TextChunk| chunks.push(chunk);
    orch.generate_text_stream(&TextGenerationRequest::new("hi"), &mut sink)
        .await
        .unwrap();

    let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(text, "ok");
    assert_eq!(chunks.iter().filter(|c| c.done).count(), 1);
}

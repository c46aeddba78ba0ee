//! Broker-routed mode tests
//!
//! The mock server plays the backend broker: `/ai/*` routes behind a bearer
//! credential, responses wrapped in the `{code, message, data}` envelope,
//! streaming as SSE in either chunk shape.

use omnigen::providers::BrokerAdapter;
use omnigen::{
    AiGateway, AiProvider, BrokerEndpoint, ConfigResolver, GatewayError, GenerationMode,
    ImageGenerationRequest, MemoryCredentialStore, TextChunk, TextGenerationRequest,
    TextToSpeechRequest, UserAIConfig, VideoGenerationRequest, VideoStatus,
};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token() -> Option<SecretString> {
    Some(SecretString::from("session-token".to_string()))
}

fn envelope(data: serde_json::Value) -> serde_json::Value {
    json!({"code": 200, "message": "success", "data": data})
}

#[tokio::test]
async fn text_generation_unwraps_the_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/text/generate"))
        .and(header("Authorization", "Bearer session-token"))
        .and(body_partial_json(json!({"prompt": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "content": "hi there",
            "provider": "gemini",
            "model": "gemini-2.0-flash-exp",
            "usage": {"inputTokens": 2, "outputTokens": 3, "totalTokens": 5},
            "finishReason": "stop"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = BrokerAdapter::new(server.uri(), token());
    let response = adapter
        .generate_text(&TextGenerationRequest::new("hello"))
        .await
        .unwrap();

    assert_eq!(response.content, "hi there");
    assert_eq!(response.provider, AiProvider::Gemini);
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(5));
}

#[tokio::test]
async fn missing_credential_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = BrokerAdapter::new(server.uri(), None);
    let err = adapter
        .generate_text(&TextGenerationRequest::new("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationRequired(_)));
}

#[tokio::test]
async fn rejected_credential_is_authentication_required_not_vendor_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/text/generate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401, "message": "token expired"
        })))
        .mount(&server)
        .await;

    let adapter = BrokerAdapter::new(server.uri(), token());
    let err = adapter
        .generate_text(&TextGenerationRequest::new("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationRequired(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn envelope_error_code_is_surfaced_with_its_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/image/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 500, "message": "no vendor available", "data": null
        })))
        .mount(&server)
        .await;

    let adapter = BrokerAdapter::new(server.uri(), token());
    let err = adapter
        .generate_image(&ImageGenerationRequest::new("a map"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no vendor available"));
}

#[tokio::test]
async fn stream_accepts_both_chunk_shapes() {
    let server = MockServer::start().await;
    // The broker may relay an OpenAI-compatible chunk or its own flat shape
    // within one stream, depending on the upstream vendor.
    let sse = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"A\"},\"finish_reason\":null}]}\n\n\
               data: {\"content\":\"B\",\"done\":false}\n\n\
               data: {\"content\":\"\",\"done\":true,\"usage\":{\"inputTokens\":1,\"outputTokens\":2,\"totalTokens\":3}}\n\n";
    Mock::given(method("POST"))
        .and(path("/ai/text/generate/stream"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = BrokerAdapter::new(server.uri(), token());
    let mut stream = adapter
        .generate_text_stream(&TextGenerationRequest::new("go"))
        .await
        .unwrap();

    use futures_util::StreamExt;
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        chunks.push(item.unwrap());
    }

    assert_eq!(chunks[0], TextChunk::delta("A"));
    assert_eq!(chunks[1], TextChunk::delta("B"));
    assert!(chunks[2].done);
    assert_eq!(chunks[2].usage.map(|u| u.total_tokens), Some(3));
    assert_eq!(chunks.len(), 3);
}

#[tokio::test]
async fn tts_and_video_round_trip_through_their_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/audio/tts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "audioUrl": "https://cdn.example/voice.mp3",
            "duration": 2.5,
            "provider": "openai",
            "model": "tts-1"
        }))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/video/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "videoUrl": "https://cdn.example/clip.mp4",
            "status": "completed",
            "provider": "gemini",
            "model": "veo-2"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = BrokerAdapter::new(server.uri(), token());

    let audio = adapter
        .text_to_speech(&TextToSpeechRequest::new("say hi"))
        .await
        .unwrap();
    assert_eq!(audio.audio_url.as_deref(), Some("https://cdn.example/voice.mp3"));
    assert_eq!(audio.duration_secs, Some(2.5));

    let video = adapter
        .generate_video(&VideoGenerationRequest::new("a sunrise"))
        .await
        .unwrap();
    assert_eq!(video.status, VideoStatus::Completed);
    assert_eq!(video.video_url.as_deref(), Some("https://cdn.example/clip.mp4"));
}

#[tokio::test]
async fn gateway_in_broker_mode_routes_through_the_broker() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/text/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "content": "brokered",
            "provider": "qwen",
            "model": "qwen-max"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    // Broker mode is the default; no vendor keys are configured locally.
    let gateway = AiGateway::new(
        ConfigResolver::new(UserAIConfig::default()),
        Arc::new(MemoryCredentialStore::new()),
        Some(BrokerEndpoint::new(server.uri(), token())),
    );

    let response = gateway
        .generate_text(&TextGenerationRequest::new("hello"))
        .await
        .unwrap();
    assert_eq!(response.content, "brokered");
    assert_eq!(response.provider, AiProvider::Qwen);
}

#[tokio::test]
async fn switching_to_direct_mode_stops_calling_the_broker() {
    let broker_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&broker_server)
        .await;

    // No vendor keys configured, so once the gateway routes directly the
    // call must short-circuit with NoProviderConfigured instead of reaching
    // the broker.
    let gateway = AiGateway::new(
        ConfigResolver::new(UserAIConfig::default()),
        Arc::new(MemoryCredentialStore::new()),
        Some(BrokerEndpoint::new(broker_server.uri(), token())),
    );

    let mut config = UserAIConfig::default();
    config.mode = GenerationMode::Direct;
    gateway.update_config(config);

    let err = gateway
        .generate_text(&TextGenerationRequest::new("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NoProviderConfigured { .. }));
}

#[tokio::test]
async fn broker_mode_without_endpoint_stays_broker_routed() {
    // Broker mode with no endpoint must not fall back to direct vendor
    // calls, even when a vendor key is configured locally.
    let gateway = AiGateway::new(
        ConfigResolver::new(UserAIConfig::default()),
        Arc::new(MemoryCredentialStore::new().with_key(AiProvider::Gemini, "local-key")),
        None,
    );

    let err = gateway
        .generate_text(&TextGenerationRequest::new("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationRequired(_)));
}

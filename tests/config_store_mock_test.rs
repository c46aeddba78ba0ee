//! Broker-backed configuration store tests
//!
//! Configuration lives behind the broker's `/ai/config` route. A failed
//! lookup must degrade to defaults rather than fail the caller, and loading
//! must never downgrade an explicit broker-mode configuration.

use omnigen::config::{BrokerConfigStore, ConfigStore};
use omnigen::{AiProvider, ConfigResolver, GenerationMode, UserAIConfig};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> BrokerConfigStore {
    BrokerConfigStore::new(server.uri(), SecretString::from("session-token".to_string()))
}

#[tokio::test]
async fn load_parses_the_config_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/config"))
        .and(header("Authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": {
                "mode": "direct",
                "textProvider": "qwen",
                "textModel": "qwen-plus",
                "enableFallback": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let loaded = store(&server).load().await.unwrap().unwrap();
    assert_eq!(loaded.mode, GenerationMode::Direct);
    assert_eq!(loaded.text_provider, Some(AiProvider::Qwen));
    assert_eq!(loaded.text_model.as_deref(), Some("qwen-plus"));
    assert_eq!(loaded.enable_fallback, Some(false));
}

#[tokio::test]
async fn failed_lookup_degrades_to_none_instead_of_erroring() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/config"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    assert!(store(&server).load().await.unwrap().is_none());
}

#[tokio::test]
async fn error_envelope_code_degrades_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 403, "message": "forbidden", "data": null
        })))
        .mount(&server)
        .await;

    assert!(store(&server).load().await.unwrap().is_none());
}

#[tokio::test]
async fn reload_merges_broker_config_over_local_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {"mode": "broker", "textProvider": "openai"}
        })))
        .mount(&server)
        .await;

    let resolver = ConfigResolver::with_store(UserAIConfig::default(), Arc::new(store(&server)));
    let resolved = resolver.reload().await.unwrap();

    assert_eq!(resolved.mode, GenerationMode::Broker);
    assert_eq!(resolved.text_provider, Some(AiProvider::OpenAi));
    // Fields the broker left unset keep their local defaults.
    assert_eq!(
        resolved.image_provider,
        UserAIConfig::default().image_provider
    );
}

#[tokio::test]
async fn save_puts_the_config_with_the_credential() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/ai/config"))
        .and(header("Authorization", "Bearer session-token"))
        .and(body_partial_json(json!({"mode": "direct"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = UserAIConfig::default();
    config.mode = GenerationMode::Direct;
    store(&server).save(&config).await.unwrap();
}

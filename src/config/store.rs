//! Configuration and credential store collaborators
//!
//! The gateway only requires `load`/`save` for configuration and a per-vendor
//! secret lookup; persistence itself lives outside this crate.

use super::UserAIConfig;
use crate::error::GatewayError;
use crate::providers::ApiEnvelope;
use crate::types::AiProvider;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persists the user's routing configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the stored configuration. `Ok(None)` means nothing is stored yet;
    /// callers fall back to defaults. A failed load degrades to defaults as
    /// well and must not fail the generation call.
    async fn load(&self) -> Result<Option<UserAIConfig>, GatewayError>;

    async fn save(&self, config: &UserAIConfig) -> Result<(), GatewayError>;
}

/// Supplies per-vendor secrets to adapters at construction/update time.
/// Secrets never travel inside request or response values.
pub trait CredentialStore: Send + Sync {
    fn api_key(&self, provider: AiProvider) -> Option<SecretString>;
}

/// In-memory config store, used for tests and as the local default layer.
#[derive(Default)]
pub struct MemoryConfigStore {
    config: Mutex<Option<UserAIConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: UserAIConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Option<UserAIConfig>, GatewayError> {
        Ok(self.config.lock().expect("config store poisoned").clone())
    }

    async fn save(&self, config: &UserAIConfig) -> Result<(), GatewayError> {
        *self.config.lock().expect("config store poisoned") = Some(config.clone());
        Ok(())
    }
}

/// In-memory credential store keyed by provider.
#[derive(Default)]
pub struct MemoryCredentialStore {
    keys: HashMap<AiProvider, SecretString>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: AiProvider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, SecretString::from(key.into()));
        self
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn api_key(&self, provider: AiProvider) -> Option<SecretString> {
        self.keys.get(&provider).cloned()
    }
}

/// Config store backed by the broker's `/ai/config` endpoint.
///
/// Loads are merged over local defaults by the resolver; a transient lookup
/// failure is reported as `Ok(None)` after logging so the caller degrades to
/// defaults instead of failing.
pub struct BrokerConfigStore {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl BrokerConfigStore {
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(crate::defaults::http::REQUEST_TIMEOUT)
                .connect_timeout(crate::defaults::http::CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn config_url(&self) -> String {
        format!("{}/ai/config", self.base_url)
    }
}

#[async_trait]
impl ConfigStore for BrokerConfigStore {
    async fn load(&self) -> Result<Option<UserAIConfig>, GatewayError> {
        let response = match self
            .client
            .get(self.config_url())
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "broker config lookup failed, using defaults");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                status = response.status().as_u16(),
                "broker config lookup rejected, using defaults"
            );
            return Ok(None);
        }

        let envelope: ApiEnvelope<UserAIConfig> = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "broker config payload invalid, using defaults");
                return Ok(None);
            }
        };

        if envelope.code != 200 {
            tracing::warn!(
                code = envelope.code,
                message = envelope.message.as_deref().unwrap_or(""),
                "broker config lookup returned error code, using defaults"
            );
            return Ok(None);
        }

        Ok(envelope.data)
    }

    async fn save(&self, config: &UserAIConfig) -> Result<(), GatewayError> {
        let response = self
            .client
            .put(self.config_url())
            .bearer_auth(self.token.expose_secret())
            .json(config)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Configuration(format!(
                "Failed to save config to broker: HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

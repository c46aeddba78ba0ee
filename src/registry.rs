//! Adapter registry
//!
//! Maps each vendor to its adapter instance and answers capability queries.
//! The registry is immutable once built; configuration changes produce a
//! fresh registry which callers swap in atomically via `Arc`.

use crate::config::CredentialStore;
use crate::error::GatewayError;
use crate::providers::{DoubaoAdapter, GeminiAdapter, OpenAiAdapter, QwenAdapter};
use crate::traits::ModelAdapter;
use crate::types::{AiProvider, Modality};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable lookup table of vendor adapters.
pub struct AdapterRegistry {
    adapters: HashMap<AiProvider, Arc<dyn ModelAdapter>>,
}

impl AdapterRegistry {
    /// Build a registry with every vendor adapter, wired to whatever
    /// credentials the store currently holds. Vendors without a key are
    /// still registered; they report `is_configured() == false` and are
    /// skipped during candidate selection.
    pub fn from_credentials(credentials: &dyn CredentialStore) -> Self {
        let mut adapters: HashMap<AiProvider, Arc<dyn ModelAdapter>> = HashMap::new();
        adapters.insert(
            AiProvider::Gemini,
            Arc::new(GeminiAdapter::new(credentials.api_key(AiProvider::Gemini))),
        );
        adapters.insert(
            AiProvider::OpenAi,
            Arc::new(OpenAiAdapter::new(credentials.api_key(AiProvider::OpenAi))),
        );
        adapters.insert(
            AiProvider::Qwen,
            Arc::new(QwenAdapter::new(credentials.api_key(AiProvider::Qwen))),
        );
        adapters.insert(
            AiProvider::Doubao,
            Arc::new(DoubaoAdapter::new(credentials.api_key(AiProvider::Doubao))),
        );
        Self { adapters }
    }

    /// Build a registry from explicit adapter instances. Used by tests to
    /// point adapters at mock servers.
    pub fn from_adapters<I>(adapters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ModelAdapter>>,
    {
        Self {
            adapters: adapters
                .into_iter()
                .map(|a| (a.provider(), a))
                .collect(),
        }
    }

    pub fn get(&self, provider: AiProvider) -> Option<Arc<dyn ModelAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    /// Adapter for `provider`, or a configuration error if the vendor is
    /// unknown to this registry.
    pub fn require(&self, provider: AiProvider) -> Result<Arc<dyn ModelAdapter>, GatewayError> {
        self.get(provider).ok_or_else(|| {
            GatewayError::Configuration(format!("no adapter registered for {provider}"))
        })
    }

    /// Configured vendors able to serve `modality`, in the fixed vendor
    /// order. The order is what makes fallback deterministic.
    pub fn configured_for(&self, modality: Modality) -> Vec<AiProvider> {
        AiProvider::ALL
            .iter()
            .copied()
            .filter(|p| {
                self.adapters
                    .get(p)
                    .is_some_and(|a| a.is_configured() && a.supports(modality))
            })
            .collect()
    }

    /// Whether `provider` is registered, configured, and supports `modality`.
    pub fn is_usable(&self, provider: AiProvider, modality: Modality) -> bool {
        self.adapters
            .get(&provider)
            .is_some_and(|a| a.is_configured() && a.supports(modality))
    }
}

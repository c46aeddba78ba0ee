//! Per-call configuration resolution

use super::{ConfigStore, UserAIConfig};
use crate::error::GatewayError;
use std::sync::{Arc, RwLock};

/// Holds the current routing configuration and hands out cheap snapshots.
///
/// Mutation replaces the whole `Arc` (copy-on-write), so a concurrent reader
/// never observes a half-updated config. Re-resolving without an intervening
/// mutation returns an equal value.
pub struct ConfigResolver {
    current: RwLock<Arc<UserAIConfig>>,
    store: Option<Arc<dyn ConfigStore>>,
}

impl ConfigResolver {
    /// Resolver with a fixed in-memory config and no backing store.
    pub fn new(config: UserAIConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
            store: None,
        }
    }

    /// Resolver seeded with defaults and backed by a store. Call
    /// [`ConfigResolver::reload`] at session start to pull the stored value.
    pub fn with_store(defaults: UserAIConfig, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            current: RwLock::new(Arc::new(defaults)),
            store: Some(store),
        }
    }

    /// The current configuration snapshot.
    pub fn resolve(&self) -> Arc<UserAIConfig> {
        self.current.read().expect("config lock poisoned").clone()
    }

    /// Replace the configuration wholesale.
    pub fn replace(&self, config: UserAIConfig) {
        *self.current.write().expect("config lock poisoned") = Arc::new(config);
    }

    /// Pull the stored configuration and merge it over the current value.
    ///
    /// A failed or empty load keeps the current value: lookup failures
    /// degrade, they never fail the caller, and they never flip an explicit
    /// mode — mode only changes on an explicit [`ConfigResolver::replace`].
    pub async fn reload(&self) -> Result<Arc<UserAIConfig>, GatewayError> {
        if let Some(store) = &self.store {
            if let Some(loaded) = store.load().await? {
                let merged = self.resolve().merged_with(loaded);
                self.replace(merged);
            }
        }
        Ok(self.resolve())
    }

    /// Persist the current configuration to the backing store, if any.
    pub async fn persist(&self) -> Result<(), GatewayError> {
        if let Some(store) = &self.store {
            store.save(&self.resolve()).await?;
        }
        Ok(())
    }
}

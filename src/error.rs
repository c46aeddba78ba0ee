//! Error types for the generation gateway
//!
//! The gateway distinguishes errors that are worth retrying against another
//! vendor (a single candidate failed) from errors that are terminal for the
//! whole call (nothing is configured, the caller is not authenticated, or
//! every candidate has been exhausted).

use crate::types::{AiProvider, Modality};
use thiserror::Error;

/// Unified error type for all gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No adapter is configured and capable for the requested modality.
    /// Raised before any network call is made.
    #[error("No provider configured for {modality} generation")]
    NoProviderConfigured { modality: Modality },

    /// A single vendor call failed (non-2xx, transport failure, or a vendor
    /// error payload). Retried against the next candidate when fallback is
    /// enabled.
    #[error("{provider} error: {message}")]
    Vendor {
        provider: AiProvider,
        message: String,
    },

    /// The caller pinned a model the chosen adapter does not recognize.
    #[error("Unsupported model '{model}' for provider {provider}")]
    UnsupportedModel {
        provider: AiProvider,
        model: String,
    },

    /// An attempt exceeded its time budget (request timeout or poll ceiling).
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Broker-routed mode was invoked without a session credential. Not
    /// vendor-specific, so never retried across vendors.
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    /// A streaming call was abandoned because a newer one began. Internal
    /// short-circuit only; the facade never surfaces this to callers.
    #[error("Stream superseded by a newer request")]
    Superseded,

    /// Every eligible candidate was tried and failed.
    #[error("All providers failed for {modality} generation (tried: {}): {last}", attempted_list(.attempted))]
    AllProvidersFailed {
        modality: Modality,
        attempted: Vec<AiProvider>,
        last: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a vendor response or stream event.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error while consuming a streaming response body.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request itself is malformed (empty prompt, missing audio, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn attempted_list(attempted: &[AiProvider]) -> String {
    attempted
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl GatewayError {
    /// Whether the fallback loop may try the next candidate after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Vendor { .. }
                | Self::UnsupportedModel { .. }
                | Self::Timeout(_)
                | Self::Http(_)
                | Self::Parse(_)
                | Self::Stream(_)
        )
    }

    /// The provider this error originated from, if it is vendor-specific.
    pub fn provider(&self) -> Option<AiProvider> {
        match self {
            Self::Vendor { provider, .. } | Self::UnsupportedModel { provider, .. } => {
                Some(*provider)
            }
            _ => None,
        }
    }

    /// Shorthand for a vendor failure.
    pub fn vendor(provider: AiProvider, message: impl Into<String>) -> Self {
        Self::Vendor {
            provider,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            Self::Http(error.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

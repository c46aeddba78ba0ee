//! Vendor adapters
//!
//! One module per backend. Each adapter owns its credentials, translates the
//! normalized request into the vendor wire shape, and parses the vendor
//! response back. OpenAI-compatible vendors (openai, qwen, doubao) share
//! their chat wire code through `openai_compat`.

mod broker;
mod doubao;
mod gemini;
mod openai;
pub(crate) mod openai_compat;
mod qwen;

pub use broker::BrokerAdapter;
pub use doubao::DoubaoAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use qwen::QwenAdapter;

use crate::error::GatewayError;
use crate::types::AiProvider;
use serde::Deserialize;

/// The broker's `{code, message, data}` response envelope. `code == 200`
/// means success regardless of transport status.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, treating any non-200 code as a broker rejection.
    pub fn into_data(self) -> Result<T, GatewayError> {
        if self.code != 200 {
            return Err(GatewayError::Http(format!(
                "Broker returned code {}: {}",
                self.code,
                self.message.as_deref().unwrap_or("no message")
            )));
        }
        self.data
            .ok_or_else(|| GatewayError::Parse("broker envelope carried no data".to_string()))
    }
}

/// HTTP client with the fixed per-attempt and connect timeouts applied.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(crate::defaults::http::REQUEST_TIMEOUT)
        .connect_timeout(crate::defaults::http::CONNECT_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Map a non-2xx response to a vendor error carrying status and body text.
pub(crate) async fn expect_success(
    provider: AiProvider,
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::vendor(
        provider,
        format!("HTTP {}: {}", status.as_u16(), body.trim()),
    ))
}

/// POST a JSON body and parse the JSON response, surfacing non-2xx as a
/// vendor error.
pub(crate) async fn post_json(
    provider: AiProvider,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, GatewayError> {
    let response = request.json(body).send().await?;
    let response = expect_success(provider, response).await?;
    Ok(response.json().await?)
}

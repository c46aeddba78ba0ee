//! Public gateway facade.
//!
//! `AiGateway` is the entry point applications hold. The routing decision
//! (call vendors directly, or delegate everything to the broker) is made
//! once, when configuration is resolved or replaced, by selecting one of two
//! `GenerationService` implementations; the per-call paths never re-branch
//! on mode.

use crate::config::{ConfigResolver, CredentialStore, GenerationMode, UserAIConfig};
use crate::error::GatewayError;
use crate::orchestrator::{GenerationOrchestrator, pump_chunks};
use crate::providers::BrokerAdapter;
use crate::registry::AdapterRegistry;
use crate::session::StreamSessionTracker;
use crate::types::{
    AudioResponse, ChunkSink, ImageGenerationRequest, ImageGenerationResponse,
    SpeechToTextRequest, TextGenerationRequest, TextGenerationResponse, TextToSpeechRequest,
    VideoGenerationRequest, VideoGenerationResponse,
};
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::{Arc, RwLock};

/// The operation surface both routing modes implement.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError>;

    async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<(), GatewayError>;

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError>;

    async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError>;

    async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError>;

    async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoGenerationResponse, GatewayError>;
}

/// Direct mode: the orchestrator fans out to vendor adapters with fallback.
pub struct DirectGateway {
    orchestrator: Arc<GenerationOrchestrator>,
}

impl DirectGateway {
    pub fn new(orchestrator: Arc<GenerationOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<GenerationOrchestrator> {
        &self.orchestrator
    }
}

#[async_trait]
impl GenerationService for DirectGateway {
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        self.orchestrator.generate_text(request).await
    }

    async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<(), GatewayError> {
        self.orchestrator.generate_text_stream(request, on_chunk).await
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        self.orchestrator.generate_image(request).await
    }

    async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError> {
        self.orchestrator.text_to_speech(request).await
    }

    async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError> {
        self.orchestrator.speech_to_text(request).await
    }

    async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoGenerationResponse, GatewayError> {
        self.orchestrator.generate_video(request).await
    }
}

/// Broker mode: every operation is delegated to the broker's `/ai/*` routes.
/// Supersession still happens client-side so a newer streaming call silences
/// an older one regardless of where generation runs.
pub struct BrokerGateway {
    adapter: BrokerAdapter,
    sessions: StreamSessionTracker,
}

impl BrokerGateway {
    pub fn new(adapter: BrokerAdapter) -> Self {
        Self {
            adapter,
            sessions: StreamSessionTracker::new(),
        }
    }
}

#[async_trait]
impl GenerationService for BrokerGateway {
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        self.adapter.generate_text(request).await
    }

    async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<(), GatewayError> {
        let session = self.sessions.begin();
        let stream = match self.adapter.generate_text_stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.sessions.finish(session.id);
                return Err(e);
            }
        };
        match pump_chunks(&self.sessions, &session, stream, on_chunk).await {
            Ok(()) => {
                self.sessions.finish(session.id);
                Ok(())
            }
            Err(GatewayError::Superseded) => Ok(()),
            Err(e) => {
                self.sessions.finish(session.id);
                Err(e)
            }
        }
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        self.adapter.generate_image(request).await
    }

    async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError> {
        self.adapter.text_to_speech(request).await
    }

    async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError> {
        self.adapter.speech_to_text(request).await
    }

    async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoGenerationResponse, GatewayError> {
        self.adapter.generate_video(request).await
    }
}

/// Broker endpoint settings for `AiGateway`.
pub struct BrokerEndpoint {
    pub base_url: String,
    pub token: Option<SecretString>,
}

impl BrokerEndpoint {
    pub fn new(base_url: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
        }
    }
}

/// The application-facing gateway.
pub struct AiGateway {
    resolver: Arc<ConfigResolver>,
    credentials: Arc<dyn CredentialStore>,
    direct: Arc<DirectGateway>,
    broker: Arc<BrokerGateway>,
    service: RwLock<Arc<dyn GenerationService>>,
}

impl AiGateway {
    /// Build a gateway. Vendor adapters are constructed from the credential
    /// store; the broker endpoint is optional and only used when the
    /// configuration selects `Broker` mode. Broker mode without an endpoint
    /// stays broker-routed and fails each call with `AuthenticationRequired`
    /// rather than silently downgrading to direct mode.
    pub fn new(
        resolver: ConfigResolver,
        credentials: Arc<dyn CredentialStore>,
        broker: Option<BrokerEndpoint>,
    ) -> Self {
        let resolver = Arc::new(resolver);
        let registry = AdapterRegistry::from_credentials(credentials.as_ref());
        let orchestrator = Arc::new(GenerationOrchestrator::new(resolver.clone(), registry));
        let direct = Arc::new(DirectGateway::new(orchestrator));
        let endpoint = broker.unwrap_or_else(|| BrokerEndpoint::new("", None));
        let broker = Arc::new(BrokerGateway::new(BrokerAdapter::new(
            endpoint.base_url,
            endpoint.token,
        )));

        let service = select_service(resolver.resolve().mode, &direct, &broker);
        Self {
            resolver,
            credentials,
            direct,
            broker,
            service: RwLock::new(service),
        }
    }

    fn reselect(&self) {
        let service = select_service(self.resolver.resolve().mode, &self.direct, &self.broker);
        *self.service.write().expect("service lock poisoned") = service;
    }

    fn service(&self) -> Arc<dyn GenerationService> {
        self.service.read().expect("service lock poisoned").clone()
    }

    pub fn config(&self) -> Arc<UserAIConfig> {
        self.resolver.resolve()
    }

    /// Replace the configuration: swap the config snapshot, rebuild the
    /// adapter registry, and re-select the backing service.
    pub fn update_config(&self, config: UserAIConfig) {
        self.resolver.replace(config);
        self.direct
            .orchestrator()
            .swap_registry(AdapterRegistry::from_credentials(self.credentials.as_ref()));
        self.reselect();
    }

    /// Reload configuration from the resolver's store (if any), then apply
    /// the same rebuild/re-select path as a local update.
    pub async fn reload_config(&self) -> Result<Arc<UserAIConfig>, GatewayError> {
        let config = self.resolver.reload().await?;
        self.direct
            .orchestrator()
            .swap_registry(AdapterRegistry::from_credentials(self.credentials.as_ref()));
        self.reselect();
        Ok(config)
    }

    pub async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        self.service().generate_text(request).await
    }

    pub async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<(), GatewayError> {
        self.service().generate_text_stream(request, on_chunk).await
    }

    pub async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        self.service().generate_image(request).await
    }

    pub async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError> {
        self.service().text_to_speech(request).await
    }

    pub async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError> {
        self.service().speech_to_text(request).await
    }

    pub async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoGenerationResponse, GatewayError> {
        self.service().generate_video(request).await
    }

    /// Convenience: generate and return plain text. With `json_mode` the
    /// model is told to answer with raw JSON and any markdown code fence
    /// around the payload is stripped.
    pub async fn generate_text_string(
        &self,
        prompt: impl Into<String>,
        system_instruction: Option<String>,
        json_mode: bool,
    ) -> Result<String, GatewayError> {
        let mut request = TextGenerationRequest::new(prompt);
        request.system_instruction = system_instruction;
        if json_mode {
            let suffix = "Respond with raw JSON only, without markdown formatting.";
            request.system_instruction = Some(match request.system_instruction.take() {
                Some(existing) => format!("{existing}\n{suffix}"),
                None => suffix.to_string(),
            });
        }

        let response = self.generate_text(&request).await?;
        let mut content = response.content.trim().to_string();
        if json_mode {
            content = strip_code_fence(&content).to_string();
        }
        Ok(content)
    }
}

fn select_service(
    mode: GenerationMode,
    direct: &Arc<DirectGateway>,
    broker: &Arc<BrokerGateway>,
) -> Arc<dyn GenerationService> {
    match mode {
        GenerationMode::Broker => broker.clone(),
        GenerationMode::Direct => direct.clone(),
    }
}

/// Strip a single surrounding markdown code fence (```json ... ``` or
/// ``` ... ```), returning the inner payload.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any.
    match rest.split_once('\n') {
        Some((first_line, body)) if !first_line.trim().is_empty() => body.trim(),
        _ => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("``` incomplete"), "``` incomplete");
    }
}

//! Generation orchestration: candidate ordering, fallback, stream sessions.
//!
//! Every operation resolves an ordered candidate list, then walks it until a
//! vendor succeeds. Candidate order is deterministic: the request's explicit
//! provider first, then the configured preference for the modality, then the
//! remaining configured-and-capable vendors in declaration order, first
//! occurrence winning. Vendors that are unconfigured or lack the modality are
//! skipped without counting as failures.

use crate::config::{ConfigResolver, UserAIConfig};
use crate::error::GatewayError;
use crate::registry::AdapterRegistry;
use crate::session::{StreamSession, StreamSessionTracker};
use crate::traits::ModelAdapter;
use crate::types::{
    AiProvider, AudioResponse, ChunkSink, ImageGenerationRequest, ImageGenerationResponse,
    Modality, SpeechToTextRequest, TextChunk, TextGenerationRequest, TextGenerationResponse,
    TextStream, TextToSpeechRequest, VideoGenerationRequest, VideoGenerationResponse,
};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use std::sync::{Arc, RwLock};

pub struct GenerationOrchestrator {
    resolver: Arc<ConfigResolver>,
    registry: RwLock<Arc<AdapterRegistry>>,
    sessions: StreamSessionTracker,
}

impl GenerationOrchestrator {
    pub fn new(resolver: Arc<ConfigResolver>, registry: AdapterRegistry) -> Self {
        Self {
            resolver,
            registry: RwLock::new(Arc::new(registry)),
            sessions: StreamSessionTracker::new(),
        }
    }

    pub fn registry(&self) -> Arc<AdapterRegistry> {
        self.registry.read().expect("registry lock poisoned").clone()
    }

    /// Install a freshly built registry. Concurrent calls keep the snapshot
    /// they already resolved.
    pub fn swap_registry(&self, registry: AdapterRegistry) {
        *self.registry.write().expect("registry lock poisoned") = Arc::new(registry);
    }

    pub fn sessions(&self) -> &StreamSessionTracker {
        &self.sessions
    }

    /// Ordered, deduplicated candidates for one call. Unusable entries are
    /// filtered here so the fallback loop only ever sees dispatchable
    /// vendors; an empty result means zero network calls will be made.
    fn candidates(
        &self,
        explicit: Option<AiProvider>,
        modality: Modality,
        config: &UserAIConfig,
        registry: &AdapterRegistry,
    ) -> Vec<AiProvider> {
        let mut ordered = Vec::with_capacity(AiProvider::ALL.len() + 2);
        if let Some(provider) = explicit {
            ordered.push(provider);
        }
        if let Some(provider) = config.preferred_provider(modality) {
            ordered.push(provider);
        }
        ordered.extend(registry.configured_for(modality));

        let mut seen = Vec::with_capacity(ordered.len());
        for provider in ordered {
            if !seen.contains(&provider) && registry.is_usable(provider, modality) {
                seen.push(provider);
            }
        }
        seen
    }

    /// Model to dispatch to one candidate. Only the explicitly requested
    /// provider gets the request's model string; the configured preference
    /// gets its configured model; every other fallback candidate runs with
    /// `None` so its own default applies.
    fn model_for(
        candidate: AiProvider,
        explicit: Option<AiProvider>,
        requested_model: Option<&str>,
        config: &UserAIConfig,
        modality: Modality,
    ) -> Option<String> {
        if explicit == Some(candidate) {
            return requested_model
                .map(str::to_string)
                .or_else(|| Self::configured_model(candidate, config, modality));
        }
        if explicit.is_none() && config.preferred_provider(modality) == Some(candidate) {
            return requested_model
                .map(str::to_string)
                .or_else(|| Self::configured_model(candidate, config, modality));
        }
        Self::configured_model(candidate, config, modality)
    }

    fn configured_model(
        candidate: AiProvider,
        config: &UserAIConfig,
        modality: Modality,
    ) -> Option<String> {
        if config.preferred_provider(modality) == Some(candidate) {
            config.preferred_model(modality).map(str::to_string)
        } else {
            None
        }
    }

    /// Walk the candidate list until an attempt succeeds. Retryable failures
    /// move to the next candidate if fallback is enabled; a fatal error or a
    /// failure with fallback disabled is terminal as-is. Exhaustion yields an
    /// aggregate error naming every attempted vendor.
    async fn run_with_fallback<T>(
        &self,
        modality: Modality,
        explicit: Option<AiProvider>,
        requested_model: Option<&str>,
        op: impl Fn(Arc<dyn ModelAdapter>, Option<String>) -> BoxFuture<'static, Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let config = self.resolver.resolve();
        let registry = self.registry();
        let candidates = self.candidates(explicit, modality, &config, &registry);
        if candidates.is_empty() {
            return Err(GatewayError::NoProviderConfigured { modality });
        }

        let mut attempted: Vec<AiProvider> = Vec::new();
        let mut last: Option<GatewayError> = None;

        for candidate in candidates {
            let adapter = registry.require(candidate)?;
            let model = Self::model_for(candidate, explicit, requested_model, &config, modality);
            tracing::debug!(provider = %candidate, ?model, %modality, "dispatching generation attempt");

            match op(adapter, model).await {
                Ok(value) => {
                    if !attempted.is_empty() {
                        tracing::info!(provider = %candidate, %modality, "fallback vendor succeeded");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    tracing::warn!(provider = %candidate, %modality, error = %e, "generation attempt failed");
                    attempted.push(candidate);
                    if !config.fallback_enabled() {
                        return Err(e);
                    }
                    last = Some(e);
                }
            }
        }

        Err(GatewayError::AllProvidersFailed {
            modality,
            attempted,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    pub async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, GatewayError> {
        let template = request.clone();
        self.run_with_fallback(
            Modality::Text,
            request.provider,
            request.model.as_deref(),
            move |adapter, model| {
                let mut request = template.clone();
                request.model = model;
                Box::pin(async move { adapter.generate_text(&request).await })
            },
        )
        .await
    }

    pub async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, GatewayError> {
        let template = request.clone();
        self.run_with_fallback(
            Modality::Image,
            request.provider,
            request.model.as_deref(),
            move |adapter, model| {
                let mut request = template.clone();
                request.model = model;
                Box::pin(async move { adapter.generate_image(&request).await })
            },
        )
        .await
    }

    pub async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<AudioResponse, GatewayError> {
        let template = request.clone();
        self.run_with_fallback(
            Modality::Audio,
            request.provider,
            request.model.as_deref(),
            move |adapter, model| {
                let mut request = template.clone();
                request.model = model;
                Box::pin(async move { adapter.text_to_speech(&request).await })
            },
        )
        .await
    }

    pub async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<AudioResponse, GatewayError> {
        let template = request.clone();
        self.run_with_fallback(
            Modality::Audio,
            request.provider,
            request.model.as_deref(),
            move |adapter, model| {
                let mut request = template.clone();
                request.model = model;
                Box::pin(async move { adapter.speech_to_text(&request).await })
            },
        )
        .await
    }

    pub async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoGenerationResponse, GatewayError> {
        let template = request.clone();
        self.run_with_fallback(
            Modality::Video,
            request.provider,
            request.model.as_deref(),
            move |adapter, model| {
                let mut request = template.clone();
                request.model = model;
                Box::pin(async move { adapter.generate_video(&request).await })
            },
        )
        .await
    }

    /// Streaming variant of the fallback loop. A session is begun before the
    /// first attempt; a newer call supersedes it and this one returns
    /// `Ok(())` quietly, since supersession is the caller's own doing, not a
    /// failure. A candidate that errors after emitting chunks falls back to
    /// the next vendor, whose output restarts and appends.
    pub async fn generate_text_stream(
        &self,
        request: &TextGenerationRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<(), GatewayError> {
        let modality = Modality::Text;
        let config = self.resolver.resolve();
        let registry = self.registry();
        let candidates = self.candidates(request.provider, modality, &config, &registry);
        if candidates.is_empty() {
            return Err(GatewayError::NoProviderConfigured { modality });
        }

        let session = self.sessions.begin();
        let mut attempted: Vec<AiProvider> = Vec::new();
        let mut last: Option<GatewayError> = None;

        for candidate in candidates {
            let adapter = registry.require(candidate)?;
            let mut attempt = request.clone();
            attempt.model = Self::model_for(
                candidate,
                request.provider,
                request.model.as_deref(),
                &config,
                modality,
            );
            tracing::debug!(provider = %candidate, session = %session.id, "dispatching stream attempt");

            let outcome = match adapter.generate_text_stream(&attempt).await {
                Ok(stream) => pump_chunks(&self.sessions, &session, stream, &mut *on_chunk).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    self.sessions.finish(session.id);
                    return Ok(());
                }
                Err(GatewayError::Superseded) => {
                    tracing::debug!(session = %session.id, "stream session superseded");
                    return Ok(());
                }
                Err(e) if !e.is_retryable() => {
                    self.sessions.finish(session.id);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(provider = %candidate, session = %session.id, error = %e, "stream attempt failed");
                    attempted.push(candidate);
                    if !config.fallback_enabled() {
                        self.sessions.finish(session.id);
                        return Err(e);
                    }
                    last = Some(e);
                }
            }
        }

        self.sessions.finish(session.id);
        Err(GatewayError::AllProvidersFailed {
            modality,
            attempted,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

/// Drive one vendor stream into the chunk sink, dropping output the moment
/// the session stops being current. A stream that ends cleanly without a
/// terminal chunk gets one synthesized, so callers always observe exactly
/// one `done == true` per completed call.
pub(crate) async fn pump_chunks(
    sessions: &StreamSessionTracker,
    session: &StreamSession,
    mut stream: TextStream,
    on_chunk: ChunkSink<'_>,
) -> Result<(), GatewayError> {
    while let Some(item) = stream.next().await {
        if session.cancel.is_cancelled() || !sessions.is_current(session.id) {
            tracing::warn!(session = %session.id, "dropping chunk from superseded stream");
            return Err(GatewayError::Superseded);
        }
        match item {
            Ok(chunk) => {
                let done = chunk.done;
                on_chunk(chunk);
                if done {
                    return Ok(());
                }
            }
            Err(e) => return Err(e),
        }
    }
    // The stream may have been superseded while draining; a stale session
    // must not observe a synthesized terminal chunk either.
    if session.cancel.is_cancelled() || !sessions.is_current(session.id) {
        tracing::warn!(session = %session.id, "dropping synthesized terminal chunk from superseded stream");
        return Err(GatewayError::Superseded);
    }
    on_chunk(TextChunk::finished(None));
    Ok(())
}

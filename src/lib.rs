//! # Omnigen - A Multi-Vendor AI Generation Gateway
//!
//! Omnigen routes text, image, speech, and video generation requests to
//! multiple AI vendors behind one normalized API, with deterministic
//! fallback when a vendor fails.
//!
//! ## Features
//!
//! - **One request shape per modality**: vendor wire formats (Gemini,
//!   OpenAI, Qwen/DashScope, Doubao) stay inside their adapters.
//! - **Two routing modes**: call vendors directly with per-vendor API keys,
//!   or delegate every operation to a backend broker over its `/ai/*`
//!   routes. The mode is a configuration decision, made once per config
//!   change, never re-branched per call.
//! - **Deterministic fallback**: the explicitly requested vendor first, then
//!   the configured preference, then the remaining configured vendors in a
//!   fixed order. A fallback vendor always runs with its own default model.
//! - **Streaming with supersession**: a newer streaming call atomically
//!   cancels the previous one; stale chunks are dropped before they reach
//!   the caller, and every completed stream delivers exactly one terminal
//!   chunk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use omnigen::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(
//!         MemoryCredentialStore::new().with_key(AiProvider::Gemini, "your-api-key"),
//!     );
//!     let mut config = UserAIConfig::default();
//!     config.mode = GenerationMode::Direct;
//!
//!     let gateway = AiGateway::new(ConfigResolver::new(config), credentials, None);
//!
//!     let request = TextGenerationRequest::new("Write a haiku about rivers.");
//!     let response = gateway.generate_text(&request).await?;
//!     println!("{} (via {})", response.content, response.provider);
//!
//!     Ok(())
//! }
//! ```
//!
//! Streaming delivers chunks through a callback; the final chunk has
//! `done == true` and may carry token usage:
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use omnigen::prelude::*;
//! # async fn demo(gateway: AiGateway) -> Result<(), GatewayError> {
//! let request = TextGenerationRequest::new("Tell me a story.");
//! let mut on_chunk = |chunk: TextChunk| {
//!     print!("{}", chunk.content);
//! };
//! gateway.generate_text_stream(&request, &mut on_chunk).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod defaults;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod session;
pub mod streaming;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::{
    ConfigResolver, ConfigStore, CredentialStore, GenerationMode, MemoryConfigStore,
    MemoryCredentialStore, UserAIConfig,
};
pub use error::GatewayError;
pub use gateway::{AiGateway, BrokerEndpoint, BrokerGateway, DirectGateway, GenerationService};
pub use orchestrator::GenerationOrchestrator;
pub use registry::AdapterRegistry;
pub use session::{SessionId, StreamSession, StreamSessionTracker};
pub use traits::ModelAdapter;
pub use types::{
    AiProvider, AudioResponse, AudioSource, ChatMessage, ChunkSink, GeneratedImage,
    ImageGenerationRequest, ImageGenerationResponse, MessageRole, Modality, SpeechToTextRequest,
    TextChunk, TextGenerationRequest, TextGenerationResponse, TextStream, TextToSpeechRequest,
    TokenUsage, VideoGenerationRequest, VideoGenerationResponse, VideoStatus,
};

/// Common imports for gateway users.
pub mod prelude {
    pub use crate::config::{
        ConfigResolver, ConfigStore, CredentialStore, GenerationMode, MemoryConfigStore,
        MemoryCredentialStore, UserAIConfig,
    };
    pub use crate::error::GatewayError;
    pub use crate::gateway::{AiGateway, BrokerEndpoint, GenerationService};
    pub use crate::traits::ModelAdapter;
    pub use crate::types::{
        AiProvider, AudioResponse, AudioSource, ChatMessage, GeneratedImage,
        ImageGenerationRequest, ImageGenerationResponse, MessageRole, Modality,
        SpeechToTextRequest, TextChunk, TextGenerationRequest, TextGenerationResponse,
        TextToSpeechRequest, TokenUsage, VideoGenerationRequest, VideoGenerationResponse,
        VideoStatus,
    };
}

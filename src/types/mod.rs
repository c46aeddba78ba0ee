//! Normalized request/response types for every modality
//!
//! Each request value is immutable after creation. Responses always name the
//! provider and model that actually produced the content.

mod audio;
mod common;
mod image;
mod text;
mod video;

pub use audio::{AudioResponse, AudioSource, SpeechToTextRequest, TextToSpeechRequest};
pub use common::{AiProvider, ChatMessage, MessageRole, Modality, TokenUsage};
pub use image::{GeneratedImage, ImageGenerationRequest, ImageGenerationResponse};
pub use text::{
    ChunkSink, TextChunk, TextGenerationRequest, TextGenerationResponse, TextStream,
};
pub use video::{VideoGenerationRequest, VideoGenerationResponse, VideoStatus};

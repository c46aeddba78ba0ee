//! Default endpoints, models, and timing budgets

use crate::types::{AiProvider, Modality};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::time::Duration;

pub mod http {
    use super::Duration;

    /// Fixed per-attempt timeout for non-streaming calls. Exceeding it is a
    /// retryable failure in the fallback loop.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

pub mod poll {
    use super::Duration;

    /// Hard attempt ceiling for asynchronous-task vendors (status polling).
    pub const MAX_ATTEMPTS: u32 = 30;
    /// Fixed interval between status polls. Bounded attempts x fixed interval
    /// keeps the effective timeout deterministic under test.
    pub const INTERVAL: Duration = Duration::from_secs(2);
}

pub mod base_url {
    pub const GEMINI: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const OPENAI: &str = "https://api.openai.com/v1";
    pub const QWEN: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
    pub const QWEN_TASKS: &str = "https://dashscope.aliyuncs.com/api/v1";
    pub const DOUBAO: &str = "https://ark.cn-beijing.volces.com/api/v3";
}

lazy_static! {
    /// System default model per provider and modality. A fallback candidate
    /// that is not the preferred provider is always dispatched with its own
    /// entry from this table, never the original candidate's model string.
    static ref DEFAULT_MODELS: HashMap<(AiProvider, Modality), &'static str> = {
        use AiProvider::*;
        use Modality::*;
        let mut m = HashMap::new();
        m.insert((Gemini, Text), "gemini-2.0-flash-exp");
        m.insert((Gemini, Image), "imagen-3.0-generate-001");
        m.insert((Gemini, Audio), "gemini-2.0-flash-exp");
        m.insert((Gemini, Video), "veo-2");
        m.insert((OpenAi, Text), "gpt-4");
        m.insert((OpenAi, Image), "dall-e-3");
        m.insert((OpenAi, Audio), "tts-1");
        m.insert((Qwen, Text), "qwen-max");
        m.insert((Qwen, Image), "wanx-v1");
        m.insert((Qwen, Audio), "paraformer-zh");
        m.insert((Doubao, Text), "doubao-pro-4k");
        m.insert((Doubao, Image), "doubao-image");
        m.insert((Doubao, Audio), "doubao-tts");
        m
    };
}

/// Default model for a provider/modality pair, if the provider serves it.
pub fn default_model(provider: AiProvider, modality: Modality) -> Option<&'static str> {
    DEFAULT_MODELS.get(&(provider, modality)).copied()
}

//! Language model capability used for answering and summarizing
//!
//! The pipeline only depends on `LanguageModel`: prompt in, text out.
//! `OpenAiChatModel` talks to any OpenAI-compatible chat completions API.

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::{ChatOptions, OpenAiChatModel};

/// Single-method language model capability
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Language model errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned no content")]
    EmptyResponse,
}

//! Error types for the question answering pipeline

use thiserror::Error;

use crate::articles::store::StoreError;
use crate::config::ConfigError;
use crate::llm::LlmError;

/// Top-level error returned by the answer pipeline
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AssistantError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AssistantError::InvalidInput(_) => "invalid_input",
            AssistantError::Upstream(_) => "upstream_error",
            AssistantError::Storage(_) => "storage_error",
            AssistantError::Configuration(_) => "configuration_error",
            AssistantError::Cancelled => "cancelled",
            AssistantError::Internal(_) => "internal_error",
        }
    }
}

impl From<ConfigError> for AssistantError {
    fn from(err: ConfigError) -> Self {
        AssistantError::Configuration(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AssistantError>;

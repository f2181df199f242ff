//! Configuration for the knowledge assistant
//!
//! Loaded from an optional TOML file layered with `ASSISTANT_*` environment
//! variables (`__` separates sections, e.g. `ASSISTANT_PIPELINE__CEILING`).

use crate::context::ranking::DEFAULT_MAX_ARTICLES;
use crate::context::token_estimator::DEFAULT_CHARS_PER_TOKEN;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "ASSISTANT";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env_source())
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` if present, then read environment overrides only
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder().add_source(env_source()).build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that the configuration is consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.ceiling == 0 {
            return Err(ConfigError::Invalid("pipeline.ceiling must be positive".to_string()));
        }
        if self.pipeline.max_articles == 0 {
            return Err(ConfigError::Invalid("pipeline.max_articles must be positive".to_string()));
        }
        if self.pipeline.chars_per_token == 0 {
            return Err(ConfigError::Invalid("pipeline.chars_per_token must be positive".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model cannot be empty".to_string()));
        }
        Ok(())
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Behaviour when summarization fails during budgeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFallback {
    /// Truncate the ranked articles' content to the ceiling's character budget
    #[default]
    Truncate,
    /// Keep whatever the greedy pass accepted
    Greedy,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Articles kept after ranking
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    /// Token ceiling for the context portion of the prompt
    #[serde(default = "default_ceiling")]
    pub ceiling: usize,

    /// Minimum articles the greedy pass must accept before summarizing (0 = none)
    #[serde(default)]
    pub min_articles: usize,

    /// Characters per token for estimation and truncation
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    #[serde(default)]
    pub summary_fallback: SummaryFallback,
}

fn default_max_articles() -> usize {
    DEFAULT_MAX_ARTICLES
}

fn default_ceiling() -> usize {
    4000
}

fn default_chars_per_token() -> usize {
    DEFAULT_CHARS_PER_TOKEN
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
            ceiling: default_ceiling(),
            min_articles: 0,
            chars_per_token: default_chars_per_token(),
            summary_fallback: SummaryFallback::default(),
        }
    }
}

/// OpenAI-compatible language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Max completion tokens for answers
    #[serde(default = "default_answer_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base backoff in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_answer_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_answer_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Summarizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Use the language model to summarize; otherwise summarize extractively
    #[serde(default = "default_summarizer_enabled")]
    pub use_model: bool,

    /// Max completion tokens for summaries
    #[serde(default = "default_summary_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_summarizer_enabled() -> bool {
    true
}

fn default_summary_max_tokens() -> u32 {
    2000
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            use_model: default_summarizer_enabled(),
            max_tokens: default_summary_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.max_articles, 5);
        assert_eq!(config.pipeline.ceiling, 4000);
        assert_eq!(config.pipeline.min_articles, 0);
        assert_eq!(config.pipeline.chars_per_token, 4);
        assert_eq!(config.pipeline.summary_fallback, SummaryFallback::Truncate);
    }

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [pipeline]
            ceiling = 2000
            summary_fallback = "greedy"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.ceiling, 2000);
        assert_eq!(config.pipeline.max_articles, 5);
        assert_eq!(config.pipeline.summary_fallback, SummaryFallback::Greedy);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.summarizer.max_tokens, 2000);
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let result = Config::from_toml_str("[pipeline]\nceiling = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = Config::default();
        config.llm.model = " ".to_string();
        assert!(config.validate().is_err());
    }
}

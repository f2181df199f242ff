//! OpenAI-compatible chat completions client

use super::{LanguageModel, LlmError};
use crate::config::LlmConfig;
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Per-call generation options
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(500),
            temperature: Some(0.3),
            system_prompt: None,
        }
    }
}

/// Language model backed by an OpenAI-compatible API
pub struct OpenAiChatModel {
    client: Client,
    api_url: String,
    model: String,
    api_key: Option<SecretString>,
    options: ChatOptions,
    max_retries: usize,
    retry_backoff: Duration,
}

impl OpenAiChatModel {
    /// Create a client from configuration, reading the key from `api_key_env`
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Initialization(e.to_string()))?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::new);

        if api_key.is_none() {
            warn!("{} is not set, requests will be sent without authorization", config.api_key_env);
        }

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
            options: ChatOptions {
                max_tokens: Some(config.max_tokens),
                temperature: Some(config.temperature),
                system_prompt: None,
            },
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.options.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let base = self.retry_backoff.as_millis() as u64;
        let exp = base.saturating_mul(1 << (attempt - 1).min(6));
        let jitter = if base > 1 {
            rand::thread_rng().gen_range(0..base / 2)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<String, Attempt> {
        let mut req = self.client.post(&self.api_url).json(request);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key.expose_secret()));
        }

        let response = req
            .send()
            .await
            .map_err(|e| Attempt::Retry(LlmError::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = LlmError::Api(format!("HTTP {}: {}", status, body));
            return Err(if is_retryable(status) {
                Attempt::Retry(err)
            } else {
                Attempt::Fatal(err)
            });
        }

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| Attempt::Fatal(LlmError::Api(format!("Failed to parse response: {}", e))))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(Attempt::Fatal(LlmError::EmptyResponse))
    }
}

enum Attempt {
    Retry(LlmError),
    Fatal(LlmError),
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self.build_request(prompt);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                debug!("Retry attempt {} for chat completion after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&request).await {
                Ok(content) => {
                    debug!("Chat completion succeeded ({} chars)", content.len());
                    return Ok(content);
                }
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    warn!("Chat completion attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::EmptyResponse))
    }
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

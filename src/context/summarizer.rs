//! Summarization of ranked articles when they cannot fit the context ceiling

use super::token_estimator::{chunk_text, TokenEstimator};
use crate::articles::Article;
use crate::llm::{LanguageModel, LlmError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Summarizer trait for different summarization strategies
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense the ranked articles into text of roughly `target_tokens`
    async fn summarize(&self, articles: &[Article], target_tokens: usize) -> Result<String, SummarizerError>;
}

/// Summarizer backed by a language model
pub struct ModelSummarizer {
    model: Arc<dyn LanguageModel>,
}

impl ModelSummarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    fn build_prompt(&self, articles: &[Article], target_tokens: usize) -> String {
        let combined: String = articles
            .iter()
            .map(|a| format!("Title: {}\nContent: {}\n\n", a.title, a.content))
            .collect();

        format!(
            "Please summarize the following articles concisely while preserving key information. \
            Keep the summary under {} tokens.\n\n{}\
            Provide a concise summary that captures the main points and key details:",
            target_tokens, combined
        )
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(&self, articles: &[Article], target_tokens: usize) -> Result<String, SummarizerError> {
        if articles.is_empty() {
            return Ok(String::new());
        }

        debug!("Summarizing {} articles, target: {} tokens", articles.len(), target_tokens);

        let summary = self.model.generate(&self.build_prompt(articles, target_tokens)).await?;
        if summary.trim().is_empty() {
            return Err(SummarizerError::EmptySummary);
        }
        Ok(summary)
    }
}

/// Offline summarizer keeping the leading chunk of each article.
///
/// The target is split evenly across articles; each share keeps the title
/// line plus as many leading words of the content as fit.
pub struct ExtractiveSummarizer {
    estimator: Arc<dyn TokenEstimator>,
}

impl ExtractiveSummarizer {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, articles: &[Article], target_tokens: usize) -> Result<String, SummarizerError> {
        if articles.is_empty() {
            return Ok(String::new());
        }

        let share = target_tokens / articles.len();
        let mut parts = Vec::with_capacity(articles.len());

        for article in articles {
            let heading = format!("{}: ", article.title);
            let room = share.saturating_sub(self.estimator.estimate(&heading) + 1);
            if room == 0 {
                continue;
            }
            let lead = chunk_text(self.estimator.as_ref(), &article.content, room)
                .into_iter()
                .next()
                .unwrap_or_default();
            parts.push(format!("{}{}", heading, lead));
        }

        if parts.is_empty() {
            return Err(SummarizerError::EmptySummary);
        }
        Ok(parts.join("\n"))
    }
}

/// Summarizer errors
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("Model error: {0}")]
    Model(#[from] LlmError),

    #[error("Summary was empty")]
    EmptySummary,
}

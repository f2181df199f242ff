//! Token estimation for context budgeting

use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Default characters per token for the ratio estimator
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Estimate tokens for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }
}

/// Fixed character-per-token ratio estimator, rounding up.
///
/// Four characters approximate one token for English prose.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    /// Create an estimator; a zero ratio is treated as one
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

#[derive(Debug, Error)]
#[error("Tokenizer initialization failed: {0}")]
pub struct EstimatorError(String);

/// Tiktoken-based token estimator using cl100k_base (GPT-4, GPT-3.5-turbo)
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl TiktokenEstimator {
    /// Create a new tiktoken estimator with cl100k_base encoding
    pub fn new() -> Result<Self, EstimatorError> {
        let bpe = cl100k_base().map_err(|e| EstimatorError(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Split text into chunks of at most `max_tokens`, respecting word boundaries.
///
/// A single word larger than the limit becomes its own chunk.
pub fn chunk_text(estimator: &dyn TokenEstimator, text: &str, max_tokens: usize) -> Vec<String> {
    if estimator.estimate(text) <= max_tokens {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0usize;

    for word in text.split_whitespace() {
        let word_size = estimator.estimate(word) + 1;
        if current_size + word_size > max_tokens && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_size = 0;
        }
        current.push(word);
        current_size += word_size;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Cut text so its estimate fits `max_tokens`.
///
/// Cuts at `max_tokens * chars_per_token` characters first, then keeps
/// shrinking for estimators that count more tokens than the ratio implies.
pub fn truncate_to_tokens(
    estimator: &dyn TokenEstimator,
    text: &str,
    max_tokens: usize,
    chars_per_token: usize,
) -> String {
    let mut limit = max_tokens.saturating_mul(chars_per_token.max(1));
    let mut truncated: String = text.chars().take(limit).collect();

    while !truncated.is_empty() && estimator.estimate(&truncated) > max_tokens {
        limit = limit * 9 / 10;
        truncated = truncated.chars().take(limit).collect();
    }

    truncated
}

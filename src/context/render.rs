//! Article rendering and prompt assembly
//!
//! The same template is used when estimating article cost and when building
//! the final prompt, so budget estimates match the rendered size.

use super::models::{ContextBlock, ContextEntry, ContextSource};
use super::token_estimator::TokenEstimator;
use crate::articles::Article;
use std::sync::Arc;

/// Separator placed between rendered context entries
pub const ARTICLE_SEPARATOR: &str = "\n\n---\n\n";

const UNKNOWN_AUTHOR: &str = "Unknown Author";
const UNCATEGORIZED: &str = "Uncategorized";
const EMPTY_CONTEXT: &str = "No relevant articles were found.";

const ANSWER_INSTRUCTIONS: &str = "Please provide a concise and accurate answer based on the \
information above. If the context doesn't contain enough information to answer the question, \
please say so.";

/// Render one article into its fixed textual template
pub fn render_article(article: &Article) -> String {
    format!(
        "Title: {}\nAuthor: {}\nCategory: {}\nContent: {}\nTags: {}",
        article.title,
        article.author_name.as_deref().unwrap_or(UNKNOWN_AUTHOR),
        article.category_name.as_deref().unwrap_or(UNCATEGORIZED),
        article.content,
        article.tags.join(", "),
    )
}

/// Joins rendered entries into a context block and wraps it into a prompt
#[derive(Clone)]
pub struct ContextAssembler {
    estimator: Arc<dyn TokenEstimator>,
}

impl ContextAssembler {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    /// Estimated cost of one article as it will appear in the prompt
    pub fn article_cost(&self, article: &Article) -> usize {
        self.estimator.estimate(&render_article(article))
    }

    /// Estimated cost of one separator between entries
    pub fn separator_cost(&self) -> usize {
        self.estimator.estimate(ARTICLE_SEPARATOR)
    }

    /// Concatenate entries in order
    pub fn assemble(&self, entries: &[ContextEntry]) -> ContextBlock {
        let text = entries
            .iter()
            .map(|e| e.rendered.as_str())
            .collect::<Vec<_>>()
            .join(ARTICLE_SEPARATOR);

        let mut article_ids = Vec::new();
        let mut summarized = false;
        for entry in entries {
            if matches!(entry.source, ContextSource::Summary { .. }) {
                summarized = true;
            }
            for id in entry.source.article_ids() {
                if !article_ids.contains(&id) {
                    article_ids.push(id);
                }
            }
        }

        ContextBlock {
            total_tokens: self.estimator.estimate(&text),
            text,
            article_ids,
            summarized,
        }
    }

    /// Build the final prompt embedding the question
    pub fn build_prompt(&self, question: &str, block: &ContextBlock) -> String {
        let context = if block.is_empty() {
            EMPTY_CONTEXT
        } else {
            block.text.as_str()
        };

        format!(
            "Based on this context:\n\n{}\n\nQuestion: {}\n\n{}",
            context,
            question.trim(),
            ANSWER_INSTRUCTIONS
        )
    }
}

//! Data models for context selection

use crate::articles::{Article, ArticleId};
use serde::{Deserialize, Serialize};

/// Article paired with its relevance score and estimated rendered cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedArticle {
    pub article: Article,
    /// Higher is more relevant
    pub score: f64,
    /// Estimated tokens of the rendered article block
    pub token_cost: usize,
}

/// Where a context entry came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContextSource {
    /// A candidate article included verbatim
    Article(ArticleId),
    /// A synthetic entry condensing several ranked articles
    Summary { article_ids: Vec<ArticleId> },
}

impl ContextSource {
    /// Article ids this entry represents
    pub fn article_ids(&self) -> Vec<ArticleId> {
        match self {
            ContextSource::Article(id) => vec![*id],
            ContextSource::Summary { article_ids } => article_ids.clone(),
        }
    }
}

/// One rendered entry of the final context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub source: ContextSource,
    pub rendered: String,
    pub tokens: usize,
}

/// Rendered context window with its estimated size
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBlock {
    pub text: String,
    pub total_tokens: usize,
    pub article_ids: Vec<ArticleId>,
    pub summarized: bool,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Check if this block fits within the ceiling
    pub fn is_within_budget(&self, ceiling: usize) -> bool {
        self.total_tokens <= ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_article_ids() {
        assert_eq!(ContextSource::Article(4).article_ids(), vec![4]);
        let summary = ContextSource::Summary {
            article_ids: vec![2, 1],
        };
        assert_eq!(summary.article_ids(), vec![2, 1]);
    }

    #[test]
    fn test_empty_block_is_within_budget() {
        let block = ContextBlock::default();
        assert!(block.is_empty());
        assert!(block.is_within_budget(0));
    }
}

//! Data models for articles, questions and answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article identifier assigned by the storage layer
pub type ArticleId = i64;

/// Read-only snapshot of a stored article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
}

impl Article {
    /// Create an article with no author, category or tags
    pub fn new(id: ArticleId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            author_name: None,
            category_name: None,
            tags: Vec::new(),
            published_at: Utc::now(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author_name = Some(author.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_name = Some(category.into());
        self
    }

    /// Attach tags, keeping the first occurrence of each name
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }
}

/// A natural-language question plus optional article hints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Explicit context article ids; empty means "use the supplied candidates"
    #[serde(default)]
    pub article_ids: Vec<ArticleId>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            article_ids: Vec::new(),
        }
    }

    pub fn with_article_ids(mut self, ids: impl IntoIterator<Item = ArticleId>) -> Self {
        self.article_ids = ids.into_iter().collect();
        self
    }
}

/// Generated answer and the articles that backed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Articles represented in the context, in ranked order
    pub used_article_ids: Vec<ArticleId>,
    /// Estimated token count of the context portion of the prompt
    pub context_tokens: usize,
    /// Whether the context was replaced by a summary
    pub summarized: bool,
}

//! Article storage read contract and an in-memory implementation

use super::models::{Article, ArticleId};
use super::search::{search_articles, SearchHit, SearchQuery};
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

/// Storage errors. Missing ids are not errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Read side of article storage used by the pipeline
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch the articles with the given ids, silently omitting missing ids.
    /// No ordering guarantee.
    async fn fetch_articles(&self, ids: &[ArticleId]) -> Result<Vec<Article>, StoreError>;

    /// Ranked full-text search
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError>;
}

/// Concurrent in-memory article store
#[derive(Default)]
pub struct InMemoryArticleStore {
    articles: DashMap<ArticleId, Article>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a set of articles; later duplicates replace earlier ones
    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let store = Self::new();
        for article in articles {
            store.insert(article);
        }
        store
    }

    /// Insert or replace an article, returning the previous snapshot
    pub fn insert(&self, article: Article) -> Option<Article> {
        self.articles.insert(article.id, article)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn fetch_articles(&self, ids: &[ArticleId]) -> Result<Vec<Article>, StoreError> {
        let found: Vec<Article> = ids
            .iter()
            .filter_map(|id| self.articles.get(id).map(|entry| entry.value().clone()))
            .collect();

        debug!("Fetched {} of {} requested articles", found.len(), ids.len());
        Ok(found)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        let snapshot: Vec<Article> = self
            .articles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let hits = search_articles(&snapshot, query);
        debug!("Search '{}' returned {} hits", query.text, hits.len());
        Ok(hits)
    }
}

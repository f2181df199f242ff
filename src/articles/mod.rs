//! Article snapshots and the read side of article storage
//!
//! The pipeline only ever reads articles. This module provides:
//! - The article, question and answer data model
//! - The `ArticleStore` read contract (`fetch_articles`)
//! - An in-memory store with ranked full-text search

pub mod models;
pub mod search;
pub mod store;

pub use models::{Answer, Article, ArticleId, Question};
pub use search::{SearchHit, SearchQuery};
pub use store::{ArticleStore, InMemoryArticleStore, StoreError};

//! Ranked full-text search over article snapshots
//!
//! Matches articles whose title and content contain every query term,
//! optionally restricted to categories whose name contains a filter string.
//! Results are ordered by rank, then by publication date (newest first).

use super::models::Article;
use crate::text::{terms, unique_terms};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Default number of search results
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Upper bound on search results, protecting the downstream context window
pub const MAX_SEARCH_LIMIT: usize = 25;

/// Full-text search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Limit clamped to `1..=MAX_SEARCH_LIMIT`
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_SEARCH_LIMIT)
    }
}

/// Search result with its storage-side rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub article: Article,
    pub rank: f64,
}

/// Run a search over a set of articles
pub fn search_articles<'a, I>(articles: I, query: &SearchQuery) -> Vec<SearchHit>
where
    I: IntoIterator<Item = &'a Article>,
{
    let query_terms = unique_terms(&query.text);
    let category_filter = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase);

    let mut hits: Vec<SearchHit> = articles
        .into_iter()
        .filter(|article| match &category_filter {
            Some(filter) => article
                .category_name
                .as_deref()
                .map(|name| name.to_lowercase().contains(filter.as_str()))
                .unwrap_or(false),
            None => true,
        })
        .filter_map(|article| {
            if query_terms.is_empty() {
                return Some(SearchHit {
                    article: article.clone(),
                    rank: 0.0,
                });
            }
            let rank = document_rank(article, query_terms.iter().map(String::as_str))?;
            Some(SearchHit {
                article: article.clone(),
                rank,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.rank
            .partial_cmp(&a.rank)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.article.published_at.cmp(&a.article.published_at))
            .then_with(|| a.article.id.cmp(&b.article.id))
    });
    hits.truncate(query.effective_limit());
    hits
}

/// Term-frequency rank normalised by document length.
///
/// Returns `None` unless every query term occurs in the document.
fn document_rank<'q>(article: &Article, query_terms: impl Iterator<Item = &'q str>) -> Option<f64> {
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    let mut length = 0usize;
    for term in terms(&article.title).chain(terms(&article.content)) {
        *frequencies.entry(term).or_insert(0) += 1;
        length += 1;
    }

    let mut matched = 0usize;
    for term in query_terms {
        matched += *frequencies.get(term)?;
    }

    Some(matched as f64 / (1.0 + (length as f64).ln()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn corpus() -> Vec<Article> {
        vec![
            Article::new(1, "Mastering PostgreSQL indexing", "GIN and BRIN indexes for PostgreSQL")
                .with_category("Databases")
                .with_published_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            Article::new(2, "Effective schema design in PostgreSQL", "Normalize for integrity")
                .with_category("Databases")
                .with_published_at(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
            Article::new(3, "Dockerizing your Python app", "Multi-stage builds")
                .with_category("DevOps")
                .with_published_at(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
        ]
    }

    #[test]
    fn test_all_terms_required() {
        let articles = corpus();
        let hits = search_articles(&articles, &SearchQuery::new("postgresql indexing"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].article.id, 1);
        assert!(hits[0].rank > 0.0);
    }

    #[test]
    fn test_rank_orders_results() {
        let articles = corpus();
        let hits = search_articles(&articles, &SearchQuery::new("PostgreSQL"));
        let ids: Vec<i64> = hits.iter().map(|h| h.article.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_category_filter_is_case_insensitive_substring() {
        let articles = corpus();
        let hits = search_articles(&articles, &SearchQuery::new("").with_category("ops"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].article.id, 3);
    }

    #[test]
    fn test_empty_query_orders_by_date() {
        let articles = corpus();
        let hits = search_articles(&articles, &SearchQuery::new("  "));
        let ids: Vec<i64> = hits.iter().map(|h| h.article.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert!(hits.iter().all(|h| h.rank == 0.0));
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(SearchQuery::new("x").with_limit(0).effective_limit(), 1);
        assert_eq!(SearchQuery::new("x").with_limit(100).effective_limit(), MAX_SEARCH_LIMIT);
        let articles = corpus();
        let hits = search_articles(&articles, &SearchQuery::new("").with_limit(2));
        assert_eq!(hits.len(), 2);
    }
}

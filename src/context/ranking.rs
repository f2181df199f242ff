//! Relevance ranking of candidate articles
//!
//! Two independent notions of relevance sit behind `RelevanceScorer`:
//! - `LexicalScorer`: client-side term overlap with title matches weighted
//! - `StorageRankScorer`: ranks reported by the storage layer's search
//!
//! `ArticleRanker` scores the whole candidate set before truncating, so a
//! lower-scoring article never displaces a higher-scoring one.

use super::models::RankedArticle;
use super::render::ContextAssembler;
use crate::articles::{Article, ArticleId, SearchHit};
use crate::text::unique_terms;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Default number of articles kept after ranking
pub const DEFAULT_MAX_ARTICLES: usize = 5;

/// Relevance strategy producing one score per candidate
pub trait RelevanceScorer: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Score each article; the result is index-aligned with `articles`
    fn score(&self, question: &str, articles: &[Article]) -> Vec<f64>;
}

impl std::fmt::Debug for dyn RelevanceScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Term-overlap scorer.
///
/// Each distinct question term contributes `title_weight` when it appears in
/// the title and `body_weight` when it appears in the content.
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    pub title_weight: f64,
    pub body_weight: f64,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self {
            title_weight: 2.0,
            body_weight: 1.0,
        }
    }
}

impl RelevanceScorer for LexicalScorer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn score(&self, question: &str, articles: &[Article]) -> Vec<f64> {
        let question_terms = unique_terms(question);

        articles
            .iter()
            .map(|article| {
                let title_terms: HashSet<String> = unique_terms(&article.title).into_iter().collect();
                let body_terms: HashSet<String> = unique_terms(&article.content).into_iter().collect();

                question_terms
                    .iter()
                    .map(|term| {
                        let mut score = 0.0;
                        if title_terms.contains(term) {
                            score += self.title_weight;
                        }
                        if body_terms.contains(term) {
                            score += self.body_weight;
                        }
                        score
                    })
                    .sum::<f64>()
            })
            .collect()
    }
}

/// Scorer that replays ranks computed by the storage layer's search.
///
/// Articles absent from the search results score zero.
#[derive(Debug, Clone, Default)]
pub struct StorageRankScorer {
    ranks: HashMap<ArticleId, f64>,
}

impl StorageRankScorer {
    pub fn from_hits(hits: &[SearchHit]) -> Self {
        let ranks = hits.iter().map(|hit| (hit.article.id, hit.rank)).collect();
        Self { ranks }
    }
}

impl RelevanceScorer for StorageRankScorer {
    fn name(&self) -> &'static str {
        "storage_rank"
    }

    fn score(&self, _question: &str, articles: &[Article]) -> Vec<f64> {
        articles
            .iter()
            .map(|article| self.ranks.get(&article.id).copied().unwrap_or(0.0))
            .collect()
    }
}

/// Orders candidates by relevance and attaches their rendered cost
#[derive(Clone)]
pub struct ArticleRanker {
    scorer: Arc<dyn RelevanceScorer>,
    assembler: ContextAssembler,
}

impl ArticleRanker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, assembler: ContextAssembler) -> Self {
        Self { scorer, assembler }
    }

    /// Rank candidates, descending by score with ties broken by ascending id,
    /// and keep at most `max_articles`
    pub fn rank(&self, question: &str, candidates: Vec<Article>, max_articles: usize) -> Vec<RankedArticle> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let scores = self.scorer.score(question, &candidates);
        let mut ranked: Vec<RankedArticle> = candidates
            .into_iter()
            .zip(scores)
            .map(|(article, score)| RankedArticle {
                token_cost: self.assembler.article_cost(&article),
                article,
                score,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.article.id.cmp(&b.article.id))
        });

        let total = ranked.len();
        ranked.truncate(max_articles);

        debug!(
            "Ranked {} candidates with {} scorer, kept {} (max: {})",
            total,
            self.scorer.name(),
            ranked.len(),
            max_articles
        );

        ranked
    }
}

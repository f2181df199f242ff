//! Token budget enforcement for the context window
//!
//! Selection runs in three tiers:
//! 1. Greedy: accept ranked articles in order while the running total
//!    (separators included) stays within the ceiling
//! 2. Summarize: when the top article alone exceeds the ceiling, or fewer
//!    than `min_articles` were accepted, replace the context with a summary
//!    of every ranked article
//! 3. Fallback: when summarization fails, apply the configured
//!    `SummaryFallback`; an oversized summary is truncated
//!
//! The returned entries never exceed the ceiling when re-estimated.

use super::models::{ContextEntry, ContextSource, RankedArticle};
use super::render::{render_article, ContextAssembler, ARTICLE_SEPARATOR};
use super::summarizer::Summarizer;
use super::token_estimator::{truncate_to_tokens, TokenEstimator};
use crate::articles::{Article, ArticleId};
use crate::config::{PipelineConfig, SummaryFallback};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub ceiling: usize,
    pub min_articles: usize,
    pub chars_per_token: usize,
    pub fallback: SummaryFallback,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for BudgetConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            ceiling: config.ceiling,
            min_articles: config.min_articles,
            chars_per_token: config.chars_per_token,
            fallback: config.summary_fallback,
        }
    }
}

/// How the final selection was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Greedy selection sufficed
    Greedy,
    /// Summary fit the ceiling as returned
    Summarized,
    /// Summary exceeded the ceiling and was truncated
    SummaryTruncated,
    /// Summarization failed; article content was truncated
    TruncatedContent,
    /// Summarization failed; the greedy selection was kept
    GreedyFallback,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::Greedy => "greedy",
            SelectionStrategy::Summarized => "summarized",
            SelectionStrategy::SummaryTruncated => "summary_truncated",
            SelectionStrategy::TruncatedContent => "truncated_content",
            SelectionStrategy::GreedyFallback => "greedy_fallback",
        }
    }

    /// Whether the summarizer was invoked
    pub fn invoked_summarizer(&self) -> bool {
        !matches!(self, SelectionStrategy::Greedy)
    }
}

/// Budgeting result
#[derive(Debug, Clone)]
pub struct BudgetSelection {
    pub entries: Vec<ContextEntry>,
    /// Sum of entry costs plus separators
    pub total_tokens: usize,
    pub strategy: SelectionStrategy,
}

impl BudgetSelection {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            total_tokens: 0,
            strategy: SelectionStrategy::Greedy,
        }
    }
}

/// Selects ranked articles or a summary under the token ceiling
pub struct ContextBudgeter {
    config: BudgetConfig,
    estimator: Arc<dyn TokenEstimator>,
    assembler: ContextAssembler,
    summarizer: Arc<dyn Summarizer>,
}

impl ContextBudgeter {
    pub fn new(
        config: BudgetConfig,
        estimator: Arc<dyn TokenEstimator>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let assembler = ContextAssembler::new(estimator.clone());
        Self {
            config,
            estimator,
            assembler,
            summarizer,
        }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Decide what enters the context
    pub async fn select(&self, ranked: &[RankedArticle]) -> BudgetSelection {
        if ranked.is_empty() {
            return BudgetSelection::empty();
        }

        let greedy = self.greedy(ranked);
        let required = self.config.min_articles.min(ranked.len());
        let oversized_top = greedy.entries.is_empty();

        debug!(
            "Greedy pass accepted {}/{} articles ({} tokens, ceiling {})",
            greedy.entries.len(),
            ranked.len(),
            greedy.total_tokens,
            self.config.ceiling
        );

        if !oversized_top && greedy.entries.len() >= required {
            return greedy;
        }

        if oversized_top {
            warn!(
                "Top article needs {} tokens, exceeding ceiling {}",
                ranked[0].token_cost, self.config.ceiling
            );
        } else {
            info!(
                "Greedy pass accepted {} articles, {} required",
                greedy.entries.len(),
                required
            );
        }

        self.summarize(ranked, greedy).await
    }

    fn greedy(&self, ranked: &[RankedArticle]) -> BudgetSelection {
        let separator = self.assembler.separator_cost();
        let mut entries = Vec::new();
        let mut total = 0usize;

        for item in ranked {
            let cost = item.token_cost + if entries.is_empty() { 0 } else { separator };
            if total + cost > self.config.ceiling {
                break;
            }
            total += cost;
            entries.push(ContextEntry {
                source: ContextSource::Article(item.article.id),
                rendered: render_article(&item.article),
                tokens: item.token_cost,
            });
        }

        BudgetSelection {
            entries,
            total_tokens: total,
            strategy: SelectionStrategy::Greedy,
        }
    }

    async fn summarize(&self, ranked: &[RankedArticle], greedy: BudgetSelection) -> BudgetSelection {
        let articles: Vec<Article> = ranked.iter().map(|r| r.article.clone()).collect();
        let article_ids = articles.iter().map(|a| a.id).collect::<Vec<_>>();

        match self.summarizer.summarize(&articles, self.config.ceiling).await {
            Ok(summary) => {
                let tokens = self.estimator.estimate(&summary);
                if tokens <= self.config.ceiling {
                    info!("Summarized {} articles into {} tokens", articles.len(), tokens);
                    self.summary_selection(summary, article_ids, SelectionStrategy::Summarized)
                } else {
                    warn!(
                        "Summary of {} tokens exceeds ceiling {}, truncating",
                        tokens, self.config.ceiling
                    );
                    let truncated = self.truncate(&summary);
                    self.summary_selection(truncated, article_ids, SelectionStrategy::SummaryTruncated)
                }
            }
            Err(e) => match self.config.fallback {
                SummaryFallback::Truncate => {
                    warn!("Summarization failed, truncating article content: {}", e);
                    let content = articles
                        .iter()
                        .map(|a| a.content.as_str())
                        .collect::<Vec<_>>()
                        .join(ARTICLE_SEPARATOR);
                    let truncated = self.truncate(&content);
                    self.summary_selection(truncated, article_ids, SelectionStrategy::TruncatedContent)
                }
                SummaryFallback::Greedy => {
                    warn!(
                        "Summarization failed, keeping {} greedily selected articles: {}",
                        greedy.entries.len(),
                        e
                    );
                    BudgetSelection {
                        strategy: SelectionStrategy::GreedyFallback,
                        ..greedy
                    }
                }
            },
        }
    }

    fn truncate(&self, text: &str) -> String {
        truncate_to_tokens(
            self.estimator.as_ref(),
            text,
            self.config.ceiling,
            self.config.chars_per_token,
        )
    }

    fn summary_selection(
        &self,
        text: String,
        article_ids: Vec<ArticleId>,
        strategy: SelectionStrategy,
    ) -> BudgetSelection {
        if text.is_empty() {
            return BudgetSelection {
                strategy,
                ..BudgetSelection::empty()
            };
        }

        let tokens = self.estimator.estimate(&text);
        BudgetSelection {
            entries: vec![ContextEntry {
                source: ContextSource::Summary { article_ids },
                rendered: text,
                tokens,
            }],
            total_tokens: tokens,
            strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::summarizer::SummarizerError;
    use crate::context::token_estimator::CharRatioEstimator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSummarizer {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl FixedSummarizer {
        fn ok(text: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(text.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _articles: &[Article], _target: usize) -> Result<String, SummarizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(SummarizerError::EmptySummary)
        }
    }

    fn ranked_with_cost(id: i64, cost: usize) -> RankedArticle {
        RankedArticle {
            article: Article::new(id, format!("Article {}", id), "body"),
            score: 1.0,
            token_cost: cost,
        }
    }

    fn budgeter(config: BudgetConfig, summarizer: Arc<FixedSummarizer>) -> ContextBudgeter {
        ContextBudgeter::new(config, Arc::new(CharRatioEstimator::default()), summarizer)
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_summarization() {
        let summarizer = FixedSummarizer::ok("unused");
        let selection = budgeter(BudgetConfig::default(), summarizer.clone()).select(&[]).await;
        assert!(selection.entries.is_empty());
        assert_eq!(selection.total_tokens, 0);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_greedy_accepts_three_of_five() {
        let summarizer = FixedSummarizer::ok("unused");
        let ranked: Vec<RankedArticle> = (1..=5).map(|id| ranked_with_cost(id, 1200)).collect();

        let selection = budgeter(BudgetConfig::default(), summarizer.clone())
            .select(&ranked)
            .await;

        assert_eq!(selection.entries.len(), 3);
        assert_eq!(selection.strategy, SelectionStrategy::Greedy);
        assert!(selection.total_tokens <= 4000);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_greedy_stops_at_first_overflow() {
        let summarizer = FixedSummarizer::ok("unused");
        let ranked = vec![
            ranked_with_cost(1, 100),
            ranked_with_cost(2, 200),
            ranked_with_cost(3, 10),
        ];
        let config = BudgetConfig {
            ceiling: 250,
            ..BudgetConfig::default()
        };

        let selection = budgeter(config, summarizer).select(&ranked).await;
        let ids: Vec<_> = selection.entries.iter().map(|e| e.source.clone()).collect();
        assert_eq!(ids, vec![ContextSource::Article(1)]);
    }

    #[tokio::test]
    async fn test_oversized_top_article_is_summarized() {
        let summarizer = FixedSummarizer::ok("a compact summary");
        let ranked = vec![ranked_with_cost(1, 5000), ranked_with_cost(2, 100)];

        let selection = budgeter(BudgetConfig::default(), summarizer.clone())
            .select(&ranked)
            .await;

        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(selection.strategy, SelectionStrategy::Summarized);
        assert_eq!(selection.entries.len(), 1);
        assert_eq!(selection.entries[0].rendered, "a compact summary");
        assert_eq!(
            selection.entries[0].source,
            ContextSource::Summary {
                article_ids: vec![1, 2]
            }
        );
    }

    #[tokio::test]
    async fn test_min_articles_triggers_summarization() {
        let summarizer = FixedSummarizer::ok("summary");
        let ranked: Vec<RankedArticle> = (1..=4).map(|id| ranked_with_cost(id, 1500)).collect();
        let config = BudgetConfig {
            min_articles: 3,
            ..BudgetConfig::default()
        };

        let selection = budgeter(config, summarizer.clone()).select(&ranked).await;
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(selection.strategy, SelectionStrategy::Summarized);
    }

    #[tokio::test]
    async fn test_min_articles_capped_by_candidate_count() {
        let summarizer = FixedSummarizer::ok("summary");
        let ranked = vec![ranked_with_cost(1, 10)];
        let config = BudgetConfig {
            min_articles: 3,
            ..BudgetConfig::default()
        };

        let selection = budgeter(config, summarizer.clone()).select(&ranked).await;
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(selection.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_summary_is_truncated() {
        let summarizer = FixedSummarizer::ok("s".repeat(1000));
        let ranked = vec![ranked_with_cost(1, 500)];
        let config = BudgetConfig {
            ceiling: 100,
            ..BudgetConfig::default()
        };

        let selection = budgeter(config, summarizer).select(&ranked).await;
        assert_eq!(selection.strategy, SelectionStrategy::SummaryTruncated);
        assert_eq!(selection.entries[0].rendered.len(), 400);
        assert!(selection.total_tokens <= 100);
    }

    #[tokio::test]
    async fn test_failed_summary_truncates_content() {
        let summarizer = FixedSummarizer::failing();
        let content = "c".repeat(20_000);
        let ranked = vec![RankedArticle {
            article: Article::new(1, "Huge", content.clone()),
            score: 1.0,
            token_cost: 5000,
        }];

        let selection = budgeter(BudgetConfig::default(), summarizer).select(&ranked).await;
        assert_eq!(selection.strategy, SelectionStrategy::TruncatedContent);
        assert_eq!(selection.entries[0].rendered, content[..16_000]);
        assert_eq!(selection.total_tokens, 4000);
    }

    #[tokio::test]
    async fn test_failed_summary_with_greedy_fallback() {
        let summarizer = FixedSummarizer::failing();
        let ranked = vec![ranked_with_cost(1, 5000)];
        let config = BudgetConfig {
            fallback: SummaryFallback::Greedy,
            ..BudgetConfig::default()
        };

        let selection = budgeter(config, summarizer).select(&ranked).await;
        assert_eq!(selection.strategy, SelectionStrategy::GreedyFallback);
        assert!(selection.entries.is_empty());
    }

    #[tokio::test]
    async fn test_selection_never_exceeds_ceiling() {
        let assembler = ContextAssembler::new(Arc::new(CharRatioEstimator::default()));
        for ceiling in [1usize, 10, 50, 120, 400, 4000] {
            for size in [0usize, 3, 40, 200, 1000] {
                let ranked: Vec<RankedArticle> = (1..=6)
                    .map(|id| {
                        let article = Article::new(id, format!("T{}", id), "w".repeat(size * id as usize));
                        RankedArticle {
                            token_cost: assembler.article_cost(&article),
                            article,
                            score: 0.0,
                        }
                    })
                    .collect();
                let config = BudgetConfig {
                    ceiling,
                    ..BudgetConfig::default()
                };

                let selection = budgeter(config, FixedSummarizer::failing()).select(&ranked).await;
                let rendered: Vec<ContextEntry> = selection.entries.clone();
                let block = assembler.assemble(&rendered);
                assert!(
                    block.total_tokens <= ceiling,
                    "ceiling {} size {}: {} tokens",
                    ceiling,
                    size,
                    block.total_tokens
                );
            }
        }
    }
}

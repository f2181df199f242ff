//! Retrieval-to-context pipeline stages
//!
//! Ranks candidate articles, enforces the context token ceiling (summarizing
//! or truncating when needed) and renders the final prompt.

pub mod budget;
pub mod models;
pub mod ranking;
pub mod render;
pub mod summarizer;
pub mod token_estimator;

pub use budget::{BudgetConfig, BudgetSelection, ContextBudgeter, SelectionStrategy};
pub use models::{ContextBlock, ContextEntry, ContextSource, RankedArticle};
pub use ranking::{ArticleRanker, LexicalScorer, RelevanceScorer, StorageRankScorer};
pub use render::{render_article, ContextAssembler, ARTICLE_SEPARATOR};
pub use summarizer::{ExtractiveSummarizer, ModelSummarizer, Summarizer, SummarizerError};
pub use token_estimator::{CharRatioEstimator, TiktokenEstimator, TokenEstimator};

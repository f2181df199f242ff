//! Knowledge base question answering
//!
//! Retrieves stored articles, ranks them against a question, fits them into a
//! bounded context window (summarizing or truncating when they cannot fit) and
//! asks a language model for the answer.

pub mod articles;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod text;

pub use error::{AssistantError, Result};
pub use pipeline::{AnswerPipeline, PipelineBuilder, PipelineState};

/// Commonly used types
pub mod prelude {
    pub use crate::articles::{
        Answer, Article, ArticleId, ArticleStore, InMemoryArticleStore, Question, SearchHit,
        SearchQuery,
    };
    pub use crate::config::{Config, PipelineConfig, SummaryFallback};
    pub use crate::context::{
        ArticleRanker, CharRatioEstimator, ContextAssembler, ContextBudgeter, ExtractiveSummarizer,
        LexicalScorer, ModelSummarizer, RelevanceScorer, StorageRankScorer, Summarizer,
        TokenEstimator,
    };
    pub use crate::error::{AssistantError, Result};
    pub use crate::llm::{LanguageModel, LlmError, OpenAiChatModel};
    pub use crate::pipeline::AnswerPipeline;
}

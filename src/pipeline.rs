//! Question answering pipeline
//!
//! Each request walks an explicit state machine:
//! `Received -> Ranked -> Budgeted -> Assembled -> Answered`, or `Failed`
//! from any state. The pipeline keeps no state between requests; the only
//! suspension points are the storage fetch, the optional summarization and
//! the language model call, awaited strictly in sequence.

use crate::articles::{Answer, Article, ArticleId, ArticleStore, Question, SearchHit};
use crate::config::{Config, PipelineConfig};
use crate::context::{
    ArticleRanker, BudgetConfig, BudgetSelection, CharRatioEstimator, ContextAssembler, ContextBlock,
    ContextBudgeter, ExtractiveSummarizer, LexicalScorer, ModelSummarizer, RankedArticle,
    RelevanceScorer, StorageRankScorer, Summarizer, TokenEstimator,
};
use crate::error::{AssistantError, Result};
use crate::llm::{ChatOptions, LanguageModel, OpenAiChatModel};
use crate::metrics::{PipelineMetrics, METRICS};
use crate::time_stage;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Per-request pipeline state
#[derive(Debug)]
pub enum PipelineState {
    Received {
        question: Question,
        candidates: Vec<Article>,
        scorer: Arc<dyn RelevanceScorer>,
    },
    Ranked {
        question: String,
        ranked: Vec<RankedArticle>,
    },
    Budgeted {
        question: String,
        selection: BudgetSelection,
    },
    Assembled {
        prompt: String,
        block: ContextBlock,
    },
    Answered(Answer),
    Failed(AssistantError),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Received { .. } => "received",
            PipelineState::Ranked { .. } => "ranked",
            PipelineState::Budgeted { .. } => "budgeted",
            PipelineState::Assembled { .. } => "assembled",
            PipelineState::Answered(_) => "answered",
            PipelineState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Answered(_) | PipelineState::Failed(_))
    }
}

/// Orchestrates ranking, budgeting, assembly and generation
pub struct AnswerPipeline {
    config: PipelineConfig,
    store: Arc<dyn ArticleStore>,
    scorer: Arc<dyn RelevanceScorer>,
    assembler: ContextAssembler,
    budgeter: ContextBudgeter,
    model: Arc<dyn LanguageModel>,
    metrics: Arc<PipelineMetrics>,
}

impl AnswerPipeline {
    /// Start building a pipeline around its three collaborators
    pub fn builder(
        store: Arc<dyn ArticleStore>,
        model: Arc<dyn LanguageModel>,
        summarizer: Arc<dyn Summarizer>,
    ) -> PipelineBuilder {
        PipelineBuilder {
            config: PipelineConfig::default(),
            store,
            model,
            summarizer,
            scorer: None,
            estimator: None,
            metrics: None,
        }
    }

    /// Wire a pipeline from configuration with OpenAI-compatible model calls
    pub fn from_config(config: &Config, store: Arc<dyn ArticleStore>) -> Result<Self> {
        config.validate()?;

        let model: Arc<dyn LanguageModel> = Arc::new(
            OpenAiChatModel::from_config(&config.llm)
                .map_err(|e| AssistantError::Configuration(e.to_string()))?,
        );
        let estimator: Arc<dyn TokenEstimator> =
            Arc::new(CharRatioEstimator::new(config.pipeline.chars_per_token));

        let summarizer: Arc<dyn Summarizer> = if config.summarizer.use_model {
            let summary_model = OpenAiChatModel::from_config(&config.llm)
                .map_err(|e| AssistantError::Configuration(e.to_string()))?
                .with_options(ChatOptions {
                    max_tokens: Some(config.summarizer.max_tokens),
                    temperature: Some(config.summarizer.temperature),
                    system_prompt: None,
                });
            Arc::new(ModelSummarizer::new(Arc::new(summary_model)))
        } else {
            Arc::new(ExtractiveSummarizer::new(estimator.clone()))
        };

        Ok(Self::builder(store, model, summarizer)
            .config(config.pipeline.clone())
            .estimator(estimator)
            .build())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer a question from caller-supplied candidates (or the question's
    /// article hints, when present) using the configured relevance scorer
    pub async fn answer(&self, question: Question, candidates: Vec<Article>) -> Result<Answer> {
        self.run(question, candidates, self.scorer.clone()).await
    }

    /// Answer from full-text search results, ranking by the storage-side rank
    pub async fn answer_from_search(&self, question: Question, hits: Vec<SearchHit>) -> Result<Answer> {
        let scorer: Arc<dyn RelevanceScorer> = if question.article_ids.is_empty() {
            Arc::new(StorageRankScorer::from_hits(&hits))
        } else {
            self.scorer.clone()
        };
        let candidates = hits.into_iter().map(|hit| hit.article).collect();
        self.run(question, candidates, scorer).await
    }

    /// Like `answer`, but gives up with `Cancelled` as soon as `cancel`
    /// resolves. An in-flight model call is dropped, not interrupted upstream.
    pub async fn answer_until<F>(&self, question: Question, candidates: Vec<Article>, cancel: F) -> Result<Answer>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                info!("Answer request cancelled by caller");
                self.metrics.record_request(AssistantError::Cancelled.kind());
                Err(AssistantError::Cancelled)
            }
            result = self.answer(question, candidates) => result,
        }
    }

    async fn run(
        &self,
        question: Question,
        candidates: Vec<Article>,
        scorer: Arc<dyn RelevanceScorer>,
    ) -> Result<Answer> {
        let span = info_span!("answer", request_id = %Uuid::new_v4());

        async move {
            let mut state = PipelineState::Received {
                question,
                candidates,
                scorer,
            };

            while !state.is_terminal() {
                let from = state.name();
                state = self.advance(state).await;
                debug!("Pipeline transition {} -> {}", from, state.name());
            }

            match state {
                PipelineState::Answered(answer) => {
                    self.metrics.record_request("answered");
                    self.metrics
                        .record_context(answer.context_tokens, answer.used_article_ids.len());
                    info!(
                        "Answered using {} articles ({} context tokens)",
                        answer.used_article_ids.len(),
                        answer.context_tokens
                    );
                    Ok(answer)
                }
                PipelineState::Failed(err) => {
                    self.metrics.record_request(err.kind());
                    error!("Answer request failed: {}", err);
                    Err(err)
                }
                other => Err(AssistantError::Internal(format!(
                    "pipeline stopped in non-terminal state {}",
                    other.name()
                ))),
            }
        }
        .instrument(span)
        .await
    }

    /// Perform one state transition
    pub async fn advance(&self, state: PipelineState) -> PipelineState {
        match state {
            PipelineState::Received {
                question,
                candidates,
                scorer,
            } => {
                if question.text.trim().is_empty() {
                    return PipelineState::Failed(AssistantError::InvalidInput(
                        "question cannot be empty".to_string(),
                    ));
                }

                let candidates = match self.resolve_candidates(&question, candidates).await {
                    Ok(candidates) => candidates,
                    Err(e) => return PipelineState::Failed(e),
                };

                let ranker = ArticleRanker::new(scorer, self.assembler.clone());
                let ranked = time_stage!(
                    self.metrics,
                    "rank",
                    ranker.rank(&question.text, candidates, self.config.max_articles)
                );

                PipelineState::Ranked {
                    question: question.text,
                    ranked,
                }
            }

            PipelineState::Ranked { question, ranked } => {
                let selection = time_stage!(self.metrics, "budget", self.budgeter.select(&ranked).await);
                self.metrics
                    .record_selection(selection.strategy.as_str(), selection.strategy.invoked_summarizer());

                PipelineState::Budgeted { question, selection }
            }

            PipelineState::Budgeted { question, selection } => {
                let block = self.assembler.assemble(&selection.entries);
                let prompt = self.assembler.build_prompt(&question, &block);
                debug!(
                    "Assembled prompt with {} context tokens ({} selection)",
                    block.total_tokens,
                    selection.strategy.as_str()
                );

                PipelineState::Assembled { prompt, block }
            }

            PipelineState::Assembled { prompt, block } => {
                match time_stage!(self.metrics, "generate", self.model.generate(&prompt).await) {
                    Ok(text) => PipelineState::Answered(Answer {
                        text,
                        used_article_ids: block.article_ids,
                        context_tokens: block.total_tokens,
                        summarized: block.summarized,
                    }),
                    Err(e) => PipelineState::Failed(AssistantError::Upstream(e)),
                }
            }

            terminal => terminal,
        }
    }

    /// Fetch hinted articles, or de-duplicate supplied candidates.
    ///
    /// Unknown ids are dropped silently.
    async fn resolve_candidates(&self, question: &Question, candidates: Vec<Article>) -> Result<Vec<Article>> {
        if question.article_ids.is_empty() {
            return Ok(dedup_by_id(candidates));
        }

        let mut seen = HashSet::new();
        let ids: Vec<ArticleId> = question
            .article_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let fetched = time_stage!(self.metrics, "fetch", self.store.fetch_articles(&ids).await)?;
        let found: Vec<Article> = dedup_by_id(fetched.into_iter().filter(|a| seen.contains(&a.id)).collect());

        let dropped = ids.len().saturating_sub(found.len());
        if dropped > 0 {
            debug!("Dropped {} unknown article ids", dropped);
            self.metrics.record_dropped_ids(dropped);
        }

        Ok(found)
    }
}

fn dedup_by_id(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles.into_iter().filter(|a| seen.insert(a.id)).collect()
}

/// Builder for `AnswerPipeline`
pub struct PipelineBuilder {
    config: PipelineConfig,
    store: Arc<dyn ArticleStore>,
    model: Arc<dyn LanguageModel>,
    summarizer: Arc<dyn Summarizer>,
    scorer: Option<Arc<dyn RelevanceScorer>>,
    estimator: Option<Arc<dyn TokenEstimator>>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Relevance scorer for `answer` (lexical by default)
    pub fn scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Token estimator (character ratio from the config by default)
    pub fn estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Metrics sink (process-wide `METRICS` by default)
    pub fn metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> AnswerPipeline {
        let estimator = self
            .estimator
            .unwrap_or_else(|| Arc::new(CharRatioEstimator::new(self.config.chars_per_token)));
        let assembler = ContextAssembler::new(estimator.clone());
        let budgeter = ContextBudgeter::new(BudgetConfig::from(&self.config), estimator, self.summarizer);

        AnswerPipeline {
            config: self.config,
            store: self.store,
            scorer: self.scorer.unwrap_or_else(|| Arc::new(LexicalScorer::default())),
            assembler,
            budgeter,
            model: self.model,
            metrics: self.metrics.unwrap_or_else(|| METRICS.clone()),
        }
    }
}

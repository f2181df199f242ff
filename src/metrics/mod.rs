//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Histogram, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Process-wide pipeline metrics
pub static METRICS: Lazy<Arc<PipelineMetrics>> = Lazy::new(|| {
    Arc::new(PipelineMetrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector for the answer pipeline
pub struct PipelineMetrics {
    registry: Registry,

    pub requests: CounterVec,
    pub summarizations: Counter,
    pub selection_strategies: CounterVec,
    pub dropped_article_ids: Counter,
    pub context_tokens: Histogram,
    pub articles_used: Histogram,
    pub stage_duration: HistogramVec,
}

impl PipelineMetrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = register_counter_vec_with_registry!(
            Opts::new("assistant_requests_total", "Total answer requests by outcome"),
            &["outcome"],
            registry
        )?;

        let summarizations = register_counter_with_registry!(
            Opts::new("assistant_summarizations_total", "Total summarizer invocations"),
            registry
        )?;

        let selection_strategies = register_counter_vec_with_registry!(
            Opts::new(
                "assistant_context_selections_total",
                "Context selections by budgeting strategy"
            ),
            &["strategy"],
            registry
        )?;

        let dropped_article_ids = register_counter_with_registry!(
            Opts::new(
                "assistant_dropped_article_ids_total",
                "Requested article ids not found in storage"
            ),
            registry
        )?;

        let context_tokens = register_histogram_with_registry!(
            "assistant_context_tokens",
            "Estimated context tokens per request",
            vec![250.0, 500.0, 1000.0, 2000.0, 3000.0, 4000.0, 8000.0],
            registry
        )?;

        let articles_used = register_histogram_with_registry!(
            "assistant_articles_used",
            "Articles represented in the context per request",
            vec![0.0, 1.0, 2.0, 3.0, 5.0, 10.0, 25.0],
            registry
        )?;

        let stage_duration = register_histogram_vec_with_registry!(
            "assistant_stage_duration_seconds",
            "Pipeline stage duration in seconds",
            &["stage"],
            registry
        )?;

        Ok(Self {
            registry,
            requests,
            summarizations,
            selection_strategies,
            dropped_article_ids,
            context_tokens,
            articles_used,
            stage_duration,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a finished request
    pub fn record_request(&self, outcome: &str) {
        self.requests.with_label_values(&[outcome]).inc();
    }

    /// Record the budgeting outcome
    pub fn record_selection(&self, strategy: &str, invoked_summarizer: bool) {
        self.selection_strategies.with_label_values(&[strategy]).inc();
        if invoked_summarizer {
            self.summarizations.inc();
        }
    }

    /// Record context size for an answered request
    pub fn record_context(&self, tokens: usize, articles: usize) {
        self.context_tokens.observe(tokens as f64);
        self.articles_used.observe(articles as f64);
    }

    pub fn record_dropped_ids(&self, count: usize) {
        if count > 0 {
            self.dropped_article_ids.inc_by(count as f64);
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Helper macro to time a pipeline stage
#[macro_export]
macro_rules! time_stage {
    ($metrics:expr, $stage:expr, $operation:expr) => {{
        let timer = $metrics.stage_duration.with_label_values(&[$stage]).start_timer();
        let result = $operation;
        timer.observe_duration();
        result
    }};
}

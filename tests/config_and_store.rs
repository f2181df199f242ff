//! Configuration loading and article store integration tests

use knowledge_assistant::articles::{Article, ArticleStore, InMemoryArticleStore, SearchQuery};
use knowledge_assistant::config::{Config, LogFormat, SummaryFallback};
use knowledge_assistant::AnswerPipeline;
use std::sync::Arc;

#[test]
fn test_config_from_toml_sections() {
    let config = Config::from_toml_str(
        r#"
        [pipeline]
        max_articles = 8
        ceiling = 2000
        min_articles = 2
        summary_fallback = "greedy"

        [llm]
        model = "gpt-4o-mini"
        max_retries = 0

        [summarizer]
        use_model = false

        [logging]
        level = "debug"
        format = "json"
    "#,
    )
    .unwrap();

    assert_eq!(config.pipeline.max_articles, 8);
    assert_eq!(config.pipeline.ceiling, 2000);
    assert_eq!(config.pipeline.min_articles, 2);
    assert_eq!(config.pipeline.chars_per_token, 4);
    assert_eq!(config.pipeline.summary_fallback, SummaryFallback::Greedy);
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.max_tokens, 500);
    assert!(!config.summarizer.use_model);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_config_rejects_zero_ceiling() {
    let result = Config::from_toml_str("[pipeline]\nceiling = 0\n");
    assert!(result.is_err());
}

#[test]
fn test_config_from_missing_file_uses_defaults() {
    let path = std::env::temp_dir().join("knowledge-assistant-missing-config.toml");
    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.pipeline.ceiling, 4000);
    assert_eq!(config.pipeline.max_articles, 5);
}

#[test]
fn test_config_from_file() {
    let path = std::env::temp_dir().join(format!("knowledge-assistant-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "[pipeline]\nceiling = 1234\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.pipeline.ceiling, 1234);
}

#[test]
fn test_pipeline_from_config_with_extractive_summarizer() {
    let mut config = Config::default();
    config.summarizer.use_model = false;
    config.llm.api_key_env = "KNOWLEDGE_ASSISTANT_TEST_UNSET_KEY".to_string();

    let store = Arc::new(InMemoryArticleStore::new());
    let pipeline = AnswerPipeline::from_config(&config, store);
    assert!(pipeline.is_ok());
}

#[test]
fn test_store_search_and_fetch() {
    let store = InMemoryArticleStore::with_articles(vec![
        Article::new(1, "Building fast APIs with FastAPI and AsyncIO", "asyncio event loop")
            .with_category("Python"),
        Article::new(2, "AsyncIO patterns for scalable services", "asyncio tasks and queues")
            .with_category("Python"),
        Article::new(3, "Dockerizing your Python app", "containers").with_category("DevOps"),
    ]);

    let hits = tokio_test::block_on(store.search(&SearchQuery::new("asyncio").with_category("python")))
        .unwrap();
    let mut ids: Vec<i64> = hits.iter().map(|h| h.article.id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    let none = tokio_test::block_on(store.search(&SearchQuery::new("asyncio").with_category("devops")))
        .unwrap();
    assert!(none.is_empty());

    let mut fetched = tokio_test::block_on(store.fetch_articles(&[3, 99, 1])).unwrap();
    fetched.sort_by_key(|a| a.id);
    assert_eq!(fetched.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3]);
}

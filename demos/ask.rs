//! Example: answer a question over a small seeded knowledge base
//!
//! Usage: `cargo run --example ask -- "how should I design postgres indexes?"`
//!
//! Reads `assistant.toml` if present plus `ASSISTANT_*` overrides. The model
//! key is taken from the variable named by `llm.api_key_env`.

use knowledge_assistant::{
    articles::{Article, ArticleStore, InMemoryArticleStore, Question, SearchQuery},
    config::Config,
    logging::init_tracing,
    metrics::METRICS,
    AnswerPipeline,
};
use std::sync::Arc;
use tracing::info;

fn seed_articles() -> Vec<Article> {
    let seed = [
        (
            "Full stack development",
            "Saqib",
            "Programming",
            "Full stack development combines front-end and back-end expertise to build complete \
             digital solutions. A full stack developer works with user interfaces, server logic, \
             and databases, ensuring seamless interaction between all layers.",
            &["Python", "FastAPI", "Docker"][..],
        ),
        (
            "Mastering PostgreSQL indexing",
            "Bob Smith",
            "Databases",
            "PostgreSQL indexing strategies like B-Tree, GIN, and BRIN can drastically improve \
             query performance. Learn when to create composite indexes, use partial indexes, and \
             apply full-text search with GIN to optimize reads without over-indexing.",
            &["PostgreSQL"][..],
        ),
        (
            "Building fast APIs with FastAPI and AsyncIO",
            "Alice Johnson",
            "Programming",
            "FastAPI leverages Python type hints and AsyncIO to deliver high-performance web \
             services. Combine async database drivers, background tasks, and validation to build \
             maintainable, production-ready APIs.",
            &["FastAPI", "AsyncIO", "Python"][..],
        ),
        (
            "Dockerizing your Python app",
            "Saqib",
            "DevOps",
            "Containerizing Python applications with Docker ensures consistent environments \
             across development and production. Use multi-stage builds, slim base images, and \
             proper caching to keep images small.",
            &["Docker", "Python"][..],
        ),
        (
            "AsyncIO patterns for scalable services",
            "Alice Johnson",
            "Programming",
            "Understand event loops, tasks, and synchronization primitives to build scalable \
             async services. Learn when to apply gather vs. wait and how to avoid deadlocks.",
            &["AsyncIO", "Python"][..],
        ),
        (
            "Effective schema design in PostgreSQL",
            "Bob Smith",
            "Databases",
            "Normalize for integrity, denormalize for performance. Use constraints, enums, and \
             views to model complex domains cleanly without sacrificing query speed.",
            &["PostgreSQL"][..],
        ),
        (
            "Query planning insights in PostgreSQL",
            "Bob Smith",
            "Databases",
            "Read EXPLAIN ANALYZE to understand sequential scans, index usage, and join \
             strategies. Adjust indexes and rewrite queries for better plans.",
            &["PostgreSQL"][..],
        ),
    ];

    seed.iter()
        .enumerate()
        .map(|(i, (title, author, category, content, tags))| {
            Article::new(i as i64 + 1, *title, *content)
                .with_author(*author)
                .with_category(*category)
                .with_tags(tags.iter().copied())
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_file("assistant.toml")?;
    init_tracing(&config.logging);

    let question = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let question = if question.trim().is_empty() {
        "How should I design PostgreSQL indexes?".to_string()
    } else {
        question
    };

    let store = Arc::new(InMemoryArticleStore::with_articles(seed_articles()));
    let pipeline = AnswerPipeline::from_config(&config, store.clone())?;

    // Broad search first, the pipeline narrows it down
    let query = SearchQuery::new(question.split_whitespace().last().unwrap_or_default())
        .with_limit(config.pipeline.max_articles * 2);
    let hits = store.search(&query).await?;
    info!("Search returned {} candidate articles", hits.len());

    let answer = if hits.is_empty() {
        let all = store.fetch_articles(&(1..=store.len() as i64).collect::<Vec<_>>()).await?;
        pipeline.answer(Question::new(&question), all).await?
    } else {
        pipeline.answer_from_search(Question::new(&question), hits).await?
    };

    println!("Q: {}", question);
    println!("A: {}", answer.text);
    println!(
        "Used articles {:?} ({} context tokens{})",
        answer.used_article_ids,
        answer.context_tokens,
        if answer.summarized { ", summarized" } else { "" }
    );

    info!("Metrics:\n{}", METRICS.export());
    Ok(())
}

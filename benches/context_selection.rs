use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use knowledge_assistant::articles::Article;
use knowledge_assistant::context::{
    ArticleRanker, CharRatioEstimator, ContextAssembler, ContextBudgeter, BudgetConfig,
    ExtractiveSummarizer, LexicalScorer, TokenEstimator,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

const WORDS: &[&str] = &[
    "python", "asyncio", "postgres", "index", "docker", "image", "schema", "fastapi", "event",
    "loop", "query", "service",
];

fn corpus(count: usize, words_per_article: usize) -> Vec<Article> {
    (0..count)
        .map(|i| {
            let body: Vec<&str> = (0..words_per_article)
                .map(|w| WORDS[(i * 7 + w * 3) % WORDS.len()])
                .collect();
            Article::new(i as i64, format!("{} {}", WORDS[i % WORDS.len()], i), body.join(" "))
        })
        .collect()
}

fn bench_ranking(c: &mut Criterion) {
    let estimator: Arc<dyn TokenEstimator> = Arc::new(CharRatioEstimator::default());
    let ranker = ArticleRanker::new(
        Arc::new(LexicalScorer::default()),
        ContextAssembler::new(estimator),
    );
    let mut group = c.benchmark_group("rank");

    for size in [10, 100, 1000].iter() {
        let articles = corpus(*size, 200);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &articles, |b, articles| {
            b.iter(|| {
                ranker.rank(
                    black_box("how do I use python asyncio with postgres"),
                    articles.clone(),
                    5,
                )
            });
        });
    }

    group.finish();
}

fn bench_budgeting(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let estimator: Arc<dyn TokenEstimator> = Arc::new(CharRatioEstimator::default());
    let ranker = ArticleRanker::new(
        Arc::new(LexicalScorer::default()),
        ContextAssembler::new(estimator.clone()),
    );
    let budgeter = ContextBudgeter::new(
        BudgetConfig::default(),
        estimator.clone(),
        Arc::new(ExtractiveSummarizer::new(estimator)),
    );

    let mut group = c.benchmark_group("budget");

    // 200 words fit greedily; 5000 words force the summarizer
    for words in [200, 5000].iter() {
        let ranked = ranker.rank("python asyncio", corpus(5, *words), 5);
        group.bench_with_input(BenchmarkId::from_parameter(words), &ranked, |b, ranked| {
            b.iter(|| rt.block_on(budgeter.select(black_box(ranked))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ranking, bench_budgeting);
criterion_main!(benches);

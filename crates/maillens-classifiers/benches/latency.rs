//! Latency benchmarks for the non-model classification paths
//!
//! The heuristic scorer and the feature extractor sit on every request
//! (the extractor feeds the cache key even when the embedding model runs),
//! so both should stay well under a millisecond.
//!
//! Run with: cargo bench -p maillens-classifiers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use maillens_classifiers::heuristic::HeuristicClassifier;
use maillens_classifiers::{CategorySet, Classifier, ClassifierConfig};
use maillens_core::TextFeatureExtractor;

const SHORT_SPAM: &str = "ВЫ ВЫИГРАЛИ ПРИЗ! Акция только сегодня, скидки до 90%!!!";
const MEDIUM_SUPPORT: &str = "Здравствуйте! После обновления не работает вход в личный \
    кабинет, появляется ошибка 500. Подскажите, пожалуйста, как восстановить доступ? \
    Проблема воспроизводится и в другом браузере.";
const LONG_BUSINESS: &str = "Добрый день! Направляем вам коммерческое предложение о \
    сотрудничестве. Наша компания более десяти лет работает на рынке логистических \
    услуг и готова предложить партнерство на выгодных условиях. В приложении вы \
    найдете презентацию, прайс-лист и проект договора. Будем рады обсудить детали \
    на встрече в удобное для вас время. Также готовы организовать пилотный проект, \
    чтобы вы могли оценить качество сервиса до подписания долгосрочного соглашения.";

fn benchmark_feature_extraction(c: &mut Criterion) {
    let extractor = TextFeatureExtractor::new().expect("Failed to build feature extractor");

    let cases = [
        ("short", SHORT_SPAM),
        ("medium", MEDIUM_SUPPORT),
        ("long", LONG_BUSINESS),
    ];

    let mut group = c.benchmark_group("Feature_Extraction");
    group.sample_size(100);

    for (name, text) in cases {
        group.bench_with_input(BenchmarkId::new("extract", name), &text, |b, text| {
            b.iter(|| extractor.extract(black_box(text)));
        });
    }

    group.finish();
}

fn benchmark_heuristic_classifier(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let config = ClassifierConfig {
        // Cache off so every iteration measures the scoring path
        use_cache: false,
        ..Default::default()
    };
    let classifier = HeuristicClassifier::new(CategorySet::default_categories(), &config)
        .expect("Failed to create heuristic classifier");

    let cases = [
        ("short_spam", SHORT_SPAM),
        ("medium_support", MEDIUM_SUPPORT),
        ("long_business", LONG_BUSINESS),
    ];

    let mut group = c.benchmark_group("Heuristic_Classifier");
    group.significance_level(0.05);
    group.sample_size(100);

    for (name, text) in cases {
        group.bench_with_input(BenchmarkId::new("classify", name), &text, |b, text| {
            b.iter(|| rt.block_on(async { classifier.classify(black_box(text)).await.unwrap() }));
        });
    }

    group.finish();
}

fn benchmark_cache_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let config = ClassifierConfig::default();
    let classifier = HeuristicClassifier::new(CategorySet::default_categories(), &config)
        .expect("Failed to create heuristic classifier");

    // Warm the cache once
    rt.block_on(async { classifier.classify(MEDIUM_SUPPORT).await.unwrap() });

    let mut group = c.benchmark_group("Cache_Hit");
    group.sample_size(100);

    group.bench_function("cached_classify", |b| {
        b.iter(|| {
            rt.block_on(async { classifier.classify(black_box(MEDIUM_SUPPORT)).await.unwrap() })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_feature_extraction,
    benchmark_heuristic_classifier,
    benchmark_cache_hit
);
criterion_main!(benches);

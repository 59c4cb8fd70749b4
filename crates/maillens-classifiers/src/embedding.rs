//! Zero-shot embedding classifier
//!
//! Scores text against category labels (or few-shot examples) by cosine
//! similarity of sentence embeddings, then normalizes the similarity vector
//! with a temperature-scaled softmax. Model failures never reach the
//! caller: a missing backend puts the classifier into heuristic mode for
//! its lifetime, and a per-call inference failure falls back to heuristic
//! scoring for that call only.

use crate::cache::ClassificationCache;
use crate::candle::CandleEmbedder;
use crate::classifier::{Classification, Classifier, Method};
use crate::config::{clamp_threshold, CategorySet, ClassifierConfig};
use crate::embedder::{cosine_similarity, mean_vector, softmax, Embedder};
use crate::heuristic::{HeuristicScorer, HEURISTIC_MODEL};
use async_trait::async_trait;
use maillens_core::{clean_email_text, sanitize, Result, TextFeatureExtractor};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Snapshot of a classifier's configuration and state.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model: String,
    pub model_loaded: bool,
    pub categories_count: usize,
    pub threshold: f32,
    pub few_shot_examples: HashMap<String, usize>,
    pub cache_size: usize,
}

/// Zero-shot classifier over a configurable category set.
pub struct EmbeddingClassifier {
    name: String,
    embedder: Option<Arc<dyn Embedder>>,
    model_label: String,
    threshold: RwLock<f32>,
    top_n: usize,
    temperature: f32,
    use_cache: bool,
    min_text_length: usize,
    max_text_length: usize,
    max_few_shot: usize,
    categories: RwLock<CategorySet>,
    few_shot: RwLock<HashMap<String, Vec<String>>>,
    cache: ClassificationCache,
    extractor: TextFeatureExtractor,
    scorer: HeuristicScorer,
}

impl EmbeddingClassifier {
    /// Create a classifier over an explicit embedding backend.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        categories: CategorySet,
        config: &ClassifierConfig,
    ) -> Result<Self> {
        let model_label = embedder.name().to_string();
        Self::build(Some(embedder), model_label, categories, config)
    }

    /// Create a classifier, loading the configured Candle model.
    ///
    /// A load failure is not an error: the classifier starts in heuristic
    /// mode instead, matching the "model unavailable" recovery contract.
    pub fn from_config(categories: CategorySet, config: &ClassifierConfig) -> Result<Self> {
        match CandleEmbedder::new(&config.model) {
            Ok(embedder) => {
                info!(model = %config.model, "Zero-shot classification available");
                let label = config.model.clone();
                Self::build(Some(Arc::new(embedder)), label, categories, config)
            }
            Err(e) => {
                warn!(error = %e, "Embedding model unavailable, running in heuristic mode");
                Self::heuristic_only(categories, config)
            }
        }
    }

    /// Create a classifier that only ever uses heuristic scoring.
    pub fn heuristic_only(categories: CategorySet, config: &ClassifierConfig) -> Result<Self> {
        Self::build(None, HEURISTIC_MODEL.to_string(), categories, config)
    }

    fn build(
        embedder: Option<Arc<dyn Embedder>>,
        model_label: String,
        categories: CategorySet,
        config: &ClassifierConfig,
    ) -> Result<Self> {
        Ok(Self {
            name: "zero-shot".to_string(),
            embedder,
            model_label,
            threshold: RwLock::new(clamp_threshold(config.threshold)),
            top_n: config.top_n,
            temperature: config.temperature,
            use_cache: config.use_cache,
            min_text_length: config.min_text_length,
            max_text_length: config.max_text_length,
            max_few_shot: config.max_few_shot,
            categories: RwLock::new(categories),
            few_shot: RwLock::new(HashMap::new()),
            cache: ClassificationCache::new(),
            extractor: TextFeatureExtractor::new()?,
            scorer: HeuristicScorer::new()?,
        })
    }

    /// Whether an embedding backend is loaded.
    pub fn model_loaded(&self) -> bool {
        self.embedder.is_some()
    }

    /// Replace the active category set.
    pub fn set_categories(&self, categories: CategorySet) {
        info!(count = categories.len(), "Category set updated");
        *self.categories.write() = categories;
    }

    /// Register a few-shot example for a category. The text is cleaned of
    /// signatures/boilerplate first so the representative embedding
    /// reflects the message body.
    pub fn add_few_shot_example(&self, category: impl Into<String>, example: &str) {
        let category = category.into();
        let cleaned = clean_email_text(example);
        info!(category = %category, "Added few-shot example");
        self.few_shot.write().entry(category).or_default().push(cleaned);
    }

    pub fn clear_cache(&self) {
        info!("Classification cache cleared");
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Configuration and state snapshot.
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model: self.model_label.clone(),
            model_loaded: self.embedder.is_some(),
            categories_count: self.categories.read().len(),
            threshold: *self.threshold.read(),
            few_shot_examples: self
                .few_shot
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.len()))
                .collect(),
            cache_size: self.cache.len(),
        }
    }

    /// Classify with explicit per-call options.
    pub async fn classify_opts(
        &self,
        text: &str,
        top_n: usize,
        use_cache: bool,
    ) -> Result<Classification> {
        let start = Instant::now();

        if text.trim().chars().count() < self.min_text_length {
            return Ok(Classification::input_too_short(
                start.elapsed().as_micros() as u64,
            ));
        }
        let categories = self.categories.read().clone();
        if categories.is_empty() {
            return Ok(Classification::no_categories(
                start.elapsed().as_micros() as u64,
            ));
        }

        let text = sanitize(text, self.max_text_length);
        let features = self.extractor.extract(text);

        let cache_key =
            ClassificationCache::key(text, &categories.signature(), &features.signature());
        if use_cache {
            if let Some(hit) = self.cache.get(&cache_key) {
                debug!("Serving cached classification result");
                return Ok(hit);
            }
        }

        let threshold = *self.threshold.read();
        let result = match &self.embedder {
            Some(embedder) => match self.embedding_scores(embedder.as_ref(), text, &categories) {
                Ok((scores, similarities)) => Classification::from_distribution(
                    scores,
                    similarities,
                    threshold,
                    top_n,
                    Method::Embedding,
                    self.model_label.clone(),
                    start.elapsed().as_micros() as u64,
                ),
                Err(e) => {
                    warn!(error = %e, "Embedding call failed, falling back to heuristic scoring");
                    let scores = self.scorer.distribution(text, &features, &categories);
                    let similarities = scores.clone();
                    Classification::from_distribution(
                        scores,
                        similarities,
                        threshold,
                        top_n,
                        Method::Fallback,
                        HEURISTIC_MODEL,
                        start.elapsed().as_micros() as u64,
                    )
                }
            },
            None => {
                let scores = self.scorer.distribution(text, &features, &categories);
                let similarities = scores.clone();
                Classification::from_distribution(
                    scores,
                    similarities,
                    threshold,
                    top_n,
                    Method::Heuristic,
                    HEURISTIC_MODEL,
                    start.elapsed().as_micros() as u64,
                )
            }
        };

        if use_cache {
            self.cache.insert(cache_key, result.clone());
        }
        Ok(result)
    }

    /// One embedding pass: probability distribution plus raw similarities,
    /// both aligned with the category set.
    fn embedding_scores(
        &self,
        embedder: &dyn Embedder,
        text: &str,
        categories: &CategorySet,
    ) -> Result<(Vec<(String, f32)>, Vec<(String, f32)>)> {
        let text_embedding = embedder.embed(text)?;

        let few_shot = self.few_shot.read();
        let mut similarities = Vec::with_capacity(categories.len());
        for category in categories.iter() {
            let category_embedding = match few_shot.get(category).filter(|e| !e.is_empty()) {
                Some(examples) => {
                    let selected: Vec<&str> = examples
                        .iter()
                        .take(self.max_few_shot)
                        .map(String::as_str)
                        .collect();
                    match embedder.embed_batch(&selected) {
                        Ok(vectors) => mean_vector(&vectors),
                        // A bad example set falls back to the label text
                        Err(e) => {
                            debug!(category, error = %e, "Few-shot embedding failed, using label");
                            embedder.embed(category)?
                        }
                    }
                }
                None => embedder.embed(category)?,
            };
            let similarity = cosine_similarity(&text_embedding, &category_embedding);
            similarities.push((category.to_string(), similarity));
        }

        let raw: Vec<f32> = similarities.iter().map(|(_, s)| *s).collect();
        let probabilities = softmax(&raw, self.temperature);
        let scores = similarities
            .iter()
            .zip(probabilities)
            .map(|((category, _), p)| (category.clone(), p))
            .collect();
        Ok((scores, similarities))
    }
}

#[async_trait]
impl Classifier for EmbeddingClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        self.classify_opts(text, self.top_n, self.use_cache).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_threshold(&self, threshold: f32) {
        let clamped = clamp_threshold(threshold);
        info!(threshold = clamped, "Confidence threshold updated");
        *self.threshold.write() = clamped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maillens_core::Error;

    /// Deterministic two-axis embedder: one axis counts advertising
    /// vocabulary, the other personal/greeting vocabulary.
    struct LexicalEmbedder;

    impl Embedder for LexicalEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            let spam = ["спам", "реклам", "приз", "акци", "выиграл", "скидк"]
                .iter()
                .filter(|w| lower.contains(*w))
                .count() as f32;
            let personal = ["личн", "сообщение", "привет", "дела", "друг"]
                .iter()
                .filter(|w| lower.contains(*w))
                .count() as f32;
            Ok(vec![spam, personal, 0.1])
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "lexical-test-embedder"
        }
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::embedding("simulated inference failure"))
        }

        fn dimension(&self) -> usize {
            0
        }

        fn name(&self) -> &str {
            "broken-embedder"
        }
    }

    fn categories() -> CategorySet {
        CategorySet::new(["Спам / Реклама", "Личное сообщение"])
    }

    fn classifier_with(embedder: Arc<dyn Embedder>) -> EmbeddingClassifier {
        let config = ClassifierConfig {
            threshold: 0.35,
            ..Default::default()
        };
        EmbeddingClassifier::new(embedder, categories(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_embedding_path_classifies_spam() {
        let classifier = classifier_with(Arc::new(LexicalEmbedder));
        let result = classifier
            .classify("Грандиозная акция! Вы выиграли приз, скидка 70%!")
            .await
            .unwrap();
        assert_eq!(result.category, "Спам / Реклама");
        assert_eq!(result.method, Method::Embedding);
        assert_eq!(result.model, "lexical-test-embedder");
        assert!(!result.is_undefined());

        let sum: f32 = result.scores.values().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let max = result.scores.values().copied().fold(0.0f32, f32::max);
        assert!((result.confidence - max).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_short_input_undefined_with_zero_confidence() {
        let classifier = classifier_with(Arc::new(LexicalEmbedder));
        for text in ["", "   ", "коротко"] {
            let result = classifier.classify(text).await.unwrap();
            assert!(result.is_undefined());
            assert_eq!(result.confidence, 0.0);
        }
    }

    #[tokio::test]
    async fn test_cache_idempotence() {
        let classifier = classifier_with(Arc::new(LexicalEmbedder));
        let text = "Привет, друг! Как дела? Личное сообщение для тебя.";
        let first = classifier.classify(text).await.unwrap();
        assert!(!first.cached);
        let second = classifier.classify(text).await.unwrap();
        assert!(second.cached);
        assert_eq!(first.scores, second.scores);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.timestamp, second.timestamp);
        assert_eq!(classifier.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_recomputes() {
        let config = ClassifierConfig {
            use_cache: false,
            ..Default::default()
        };
        let classifier =
            EmbeddingClassifier::new(Arc::new(LexicalEmbedder), categories(), &config).unwrap();
        let text = "Привет, друг! Как дела? Личное сообщение для тебя.";
        classifier.classify(text).await.unwrap();
        let second = classifier.classify(text).await.unwrap();
        assert!(!second.cached);
        assert_eq!(classifier.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_per_call_failure_falls_back_to_heuristic() {
        let classifier = classifier_with(Arc::new(BrokenEmbedder));
        let result = classifier
            .classify("ВЫ ВЫИГРАЛИ ПРИЗ! Акция, всё бесплатно, скидки!!!")
            .await
            .unwrap();
        assert_eq!(result.method, Method::Fallback);
        assert_eq!(result.model, HEURISTIC_MODEL);
        assert_eq!(result.category, "Спам / Реклама");
        let sum: f32 = result.scores.values().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_heuristic_mode_without_model() {
        let config = ClassifierConfig::default();
        let classifier =
            EmbeddingClassifier::heuristic_only(categories(), &config).unwrap();
        assert!(!classifier.model_loaded());
        let result = classifier
            .classify("Привет! Как дела? Давно не виделись, обнимаю.")
            .await
            .unwrap();
        assert_eq!(result.method, Method::Heuristic);
        assert_eq!(result.category, "Личное сообщение");
    }

    #[tokio::test]
    async fn test_few_shot_examples_shape_the_representative() {
        let classifier = classifier_with(Arc::new(LexicalEmbedder));
        // Bare label "Новости" has no lexical signal for the test embedder;
        // few-shot examples with advertising vocabulary pull it toward the
        // spam axis.
        classifier.set_categories(CategorySet::new(["Новости", "Личное сообщение"]));
        classifier.add_few_shot_example("Новости", "Скидки и акции в нашем магазине!");
        classifier.add_few_shot_example("Новости", "Реклама новых продуктов и призов");

        let result = classifier
            .classify("Только сегодня акция: призы и скидки каждому!")
            .await
            .unwrap();
        assert_eq!(result.category, "Новости");
        let info = classifier.model_info();
        assert_eq!(info.few_shot_examples.get("Новости"), Some(&2));
    }

    #[tokio::test]
    async fn test_empty_category_set_fixed_result() {
        let config = ClassifierConfig::default();
        let classifier =
            EmbeddingClassifier::new(Arc::new(LexicalEmbedder), CategorySet::default(), &config)
                .unwrap();
        let result = classifier
            .classify("Любой достаточно длинный текст письма подойдёт.")
            .await
            .unwrap();
        assert!(result.is_undefined());
        assert_eq!(result.method, Method::NoCategories);
    }
}

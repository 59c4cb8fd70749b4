//! Keyword/rule-based fallback classifier
//!
//! Produces results of the same shape as the embedding path when no model
//! is available. Each category is scored by the rule group its name maps
//! to: keyword hits contribute a fixed base weight and feature-derived
//! signals add smaller bonuses. Categories with no rule group receive a
//! deterministic pseudo-score seeded from a hash of (category, text prefix)
//! — intentionally not true randomness, so benchmark runs reproduce.

use crate::cache::ClassificationCache;
use crate::classifier::{Classification, Classifier, Method};
use crate::config::{clamp_threshold, is_sentinel_label, CategorySet, ClassifierConfig};
use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use maillens_core::{sanitize, Error, Result, TextFeatureExtractor, TextFeatures};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::time::Instant;

/// Model tag carried by heuristic results.
pub const HEURISTIC_MODEL: &str = "heuristic-lexicon";

/// How much of the text seeds the pseudo-score for unmatched categories.
const PSEUDO_SEED_PREFIX: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleGroup {
    Business,
    Complaint,
    Support,
    Spam,
    Personal,
    Finance,
    Hr,
    Legal,
    News,
    Marketing,
    Sentinel,
}

impl RuleGroup {
    /// Map a category name onto its rule group by substring.
    fn detect(category: &str) -> Option<Self> {
        let lower = category.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

        if has(&["not defined", "не определен"]) {
            Some(Self::Sentinel)
        } else if has(&["business", "делов"]) {
            Some(Self::Business)
        } else if has(&["complaint", "жалоб"]) {
            Some(Self::Complaint)
        } else if has(&["support", "поддерж", "технич"]) {
            Some(Self::Support)
        } else if has(&["spam", "реклам"]) {
            Some(Self::Spam)
        } else if has(&["personal", "личн"]) {
            Some(Self::Personal)
        } else if has(&["finance", "финанс"]) {
            Some(Self::Finance)
        } else if has(&["hr", "кадр", "рекрут"]) {
            Some(Self::Hr)
        } else if has(&["legal", "юрид", "правов"]) {
            Some(Self::Legal)
        } else if has(&["news", "новост"]) {
            Some(Self::News)
        } else if has(&["marketing", "маркетинг"]) {
            Some(Self::Marketing)
        } else {
            None
        }
    }
}

/// Scores a category set against text with keyword rules, then normalizes
/// into a probability distribution. Shared by the standalone heuristic
/// classifier and the embedding classifier's fallback path.
pub struct HeuristicScorer {
    business: AhoCorasick,
    complaint: AhoCorasick,
    support: AhoCorasick,
    spam: AhoCorasick,
    personal: AhoCorasick,
    finance: AhoCorasick,
    hr: AhoCorasick,
    legal: AhoCorasick,
    news: AhoCorasick,
    marketing: AhoCorasick,
}

fn build_matcher(patterns: &[&str]) -> Result<AhoCorasick> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .map_err(|e| Error::classifier(format!("Failed to build keyword matcher: {e}")))
}

impl HeuristicScorer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            business: build_matcher(&[
                "предложен",
                "сотрудничеств",
                "партнерств",
                "коммерческ",
                "договор",
            ])?,
            complaint: build_matcher(&["жалоб", "недовол", "проблем", "претензи", "возражен"])?,
            support: build_matcher(&[
                "помощ",
                "поддержк",
                "ошибк",
                "техническ",
                "сбо",
                "не работ",
            ])?,
            spam: build_matcher(&[
                "выиграл",
                "приз",
                "акци",
                "бесплатно",
                "congratulation",
                "распродаж",
                "скидк",
            ])?,
            personal: build_matcher(&[
                "привет",
                "здравств",
                "спасиб",
                "личн",
                "встреч",
                "как дела",
            ])?,
            finance: build_matcher(&["счет", "оплат", "деньг", "финанс", "бюджет", "платеж"])?,
            hr: build_matcher(&[
                "ваканс",
                "резюме",
                "собеседован",
                "работ",
                "зарплат",
                "отпуск",
            ])?,
            legal: build_matcher(&["договор", "юрид", "закон", "прав", "соглашен", "контракт"])?,
            news: build_matcher(&["новост", "анонс", "объявлен", "информиру", "сообща"])?,
            marketing: build_matcher(&[
                "маркетинг",
                "реклам",
                "продвижен",
                "клиент",
                "продаж",
            ])?,
        })
    }

    /// Raw score for one category in [0, 1].
    fn category_score(&self, category: &str, text: &str, features: &TextFeatures) -> f32 {
        let mut score = match RuleGroup::detect(category) {
            Some(RuleGroup::Business) => {
                let mut s = 0.0;
                if self.business.is_match(text) {
                    s += 0.8;
                }
                if features.formal_score > 0 {
                    s += 0.2;
                }
                if features.formality_ratio > 0.7 {
                    s += 0.15;
                }
                s
            }
            Some(RuleGroup::Complaint) => {
                let mut s = 0.0;
                if self.complaint.is_match(text) {
                    s += 0.8;
                }
                if features.exclamation_count > 1 {
                    s += 0.2;
                }
                if features.negative_score > features.positive_score {
                    s += 0.15;
                }
                s
            }
            Some(RuleGroup::Support) => {
                let mut s = 0.0;
                if self.support.is_match(text) {
                    s += 0.8;
                }
                if features.question_count > 0 {
                    s += 0.2;
                }
                if features.has_questions {
                    s += 0.15;
                }
                s
            }
            Some(RuleGroup::Spam) => {
                let mut s = 0.0;
                if self.spam.is_match(text) {
                    s += 0.9;
                }
                if features.uppercase_ratio > 0.3 {
                    s += 0.2;
                }
                if features.exclamation_count > 2 {
                    s += 0.15;
                }
                s
            }
            Some(RuleGroup::Personal) => {
                let mut s = 0.0;
                if self.personal.is_match(text) {
                    s += 0.7;
                }
                if features.has_greeting {
                    s += 0.3;
                }
                if features.informal_score > 0 {
                    s += 0.15;
                }
                s
            }
            Some(RuleGroup::Finance) => {
                let mut s = 0.0;
                if self.finance.is_match(text) {
                    s += 0.8;
                }
                if features.digit_count > 0 {
                    s += 0.2;
                }
                if features.has_money {
                    s += 0.15;
                }
                s
            }
            Some(RuleGroup::Hr) => {
                let mut s = 0.0;
                if self.hr.is_match(text) {
                    s += 0.8;
                }
                if features.formal_score > 0 {
                    s += 0.2;
                }
                s
            }
            Some(RuleGroup::Legal) => {
                let mut s = 0.0;
                if self.legal.is_match(text) {
                    s += 0.8;
                }
                if features.formality_ratio > 0.8 {
                    s += 0.2;
                }
                s
            }
            Some(RuleGroup::News) => {
                let mut s = 0.0;
                if self.news.is_match(text) {
                    s += 0.8;
                }
                if features.formal_score > 0 {
                    s += 0.2;
                }
                s
            }
            Some(RuleGroup::Marketing) => {
                if self.marketing.is_match(text) {
                    0.8
                } else {
                    0.0
                }
            }
            Some(RuleGroup::Sentinel) => 0.1,
            None => pseudo_score(category, text),
        };

        // Complex text earns less confidence from shallow signals
        if features.text_complexity > 0.7 {
            score *= 0.9;
        }
        score.clamp(0.0, 1.0)
    }

    /// Score every category and normalize into a distribution summing to 1.
    pub fn distribution(
        &self,
        text: &str,
        features: &TextFeatures,
        categories: &CategorySet,
    ) -> Vec<(String, f32)> {
        let lower = text.to_lowercase();
        let raw: Vec<(String, f32)> = categories
            .iter()
            .map(|category| {
                (
                    category.to_string(),
                    self.category_score(category, &lower, features),
                )
            })
            .collect();

        let total: f32 = raw.iter().map(|(_, s)| s).sum();
        if total > 0.0 {
            raw.into_iter().map(|(c, s)| (c, s / total)).collect()
        } else {
            let uniform = 1.0 / raw.len().max(1) as f32;
            raw.into_iter().map(|(c, _)| (c, uniform)).collect()
        }
    }
}

/// Deterministic pseudo-score in [0.1, 0.4] for categories without a rule
/// group, seeded from the category name and the text prefix. Identical
/// inputs always reproduce the same score.
fn pseudo_score(category: &str, text: &str) -> f32 {
    let prefix: String = text.chars().take(PSEUDO_SEED_PREFIX).collect();
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(prefix.as_bytes());
    let digest = hasher.finalize();
    let seed = u64::from_be_bytes(digest[..8].try_into().unwrap_or_default());
    0.1 + 0.3 * (seed as f64 / u64::MAX as f64) as f32
}

/// Standalone rule-based classifier, usable wherever the embedding
/// classifier is.
pub struct HeuristicClassifier {
    name: String,
    threshold: RwLock<f32>,
    top_n: usize,
    min_text_length: usize,
    max_text_length: usize,
    use_cache: bool,
    categories: RwLock<CategorySet>,
    extractor: TextFeatureExtractor,
    scorer: HeuristicScorer,
    cache: ClassificationCache,
}

impl HeuristicClassifier {
    pub fn new(categories: CategorySet, config: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            name: "heuristic".to_string(),
            threshold: RwLock::new(clamp_threshold(config.threshold)),
            top_n: config.top_n,
            min_text_length: config.min_text_length,
            max_text_length: config.max_text_length,
            use_cache: config.use_cache,
            categories: RwLock::new(categories),
            extractor: TextFeatureExtractor::new()?,
            scorer: HeuristicScorer::new()?,
            cache: ClassificationCache::new(),
        })
    }

    pub fn set_categories(&self, categories: CategorySet) {
        *self.categories.write() = categories;
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl Classifier for HeuristicClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
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
        if self.use_cache {
            if let Some(hit) = self.cache.get(&cache_key) {
                tracing::debug!("Serving cached heuristic result");
                return Ok(hit);
            }
        }

        let scores = self.scorer.distribution(text, &features, &categories);
        let similarities = scores.clone();
        let result = Classification::from_distribution(
            scores,
            similarities,
            *self.threshold.read(),
            self.top_n,
            Method::Heuristic,
            HEURISTIC_MODEL,
            start.elapsed().as_micros() as u64,
        );

        if self.use_cache {
            self.cache.insert(cache_key, result.clone());
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_threshold(&self, threshold: f32) {
        let clamped = clamp_threshold(threshold);
        tracing::info!(threshold = clamped, "Heuristic threshold updated");
        *self.threshold.write() = clamped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(threshold: f32) -> HeuristicClassifier {
        let config = ClassifierConfig {
            threshold,
            ..Default::default()
        };
        HeuristicClassifier::new(CategorySet::default_categories(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_spam_text_scores_spam() {
        let classifier = classifier(0.15);
        let result = classifier
            .classify("ВЫ ВЫИГРАЛИ ПРИЗ! Акция только сегодня, всё бесплатно!!!")
            .await
            .unwrap();
        assert_eq!(result.category, "Спам / Реклама");
        assert!(!result.is_undefined());
        assert_eq!(result.method, Method::Heuristic);
        assert_eq!(result.model, HEURISTIC_MODEL);
    }

    #[tokio::test]
    async fn test_greeting_text_scores_personal() {
        let classifier = classifier(0.15);
        let result = classifier
            .classify("Привет! Как дела? Давно не виделись, позвони мне вечером.")
            .await
            .unwrap();
        assert_eq!(result.category, "Личное сообщение");
        assert!(!result.is_undefined());
    }

    #[tokio::test]
    async fn test_scores_sum_to_one_and_confidence_is_max() {
        let classifier = classifier(0.15);
        let result = classifier
            .classify("Здравствуйте! Не могу войти в систему, получаю ошибку 500. Помогите?")
            .await
            .unwrap();
        let sum: f32 = result.scores.values().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let max = result.scores.values().copied().fold(0.0f32, f32::max);
        assert!((result.confidence - max).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_short_input_is_undefined() {
        let classifier = classifier(0.15);
        let result = classifier.classify("привет").await.unwrap();
        assert!(result.is_undefined());
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_empty_categories_fixed_result() {
        let config = ClassifierConfig::default();
        let classifier = HeuristicClassifier::new(CategorySet::default(), &config).unwrap();
        for text in [
            "Здравствуйте, это достаточно длинный текст письма.",
            "Совсем другое письмо с другим содержанием внутри.",
        ] {
            let result = classifier.classify(text).await.unwrap();
            assert!(result.is_undefined());
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.method, Method::NoCategories);
        }
    }

    #[tokio::test]
    async fn test_cache_hit_is_bit_identical() {
        let classifier = classifier(0.15);
        let text = "Направляем счёт на оплату услуг за декабрь, сумма 150000 рублей.";
        let first = classifier.classify(text).await.unwrap();
        assert!(!first.cached);
        let second = classifier.classify(text).await.unwrap();
        assert!(second.cached);
        assert_eq!(first.category, second.category);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.scores, second.scores);
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[tokio::test]
    async fn test_unmatched_category_score_is_deterministic() {
        let text = "Произвольное содержание письма без особых ключевых слов вообще.";
        let a = pseudo_score("Экзотика", text);
        let b = pseudo_score("Экзотика", text);
        assert_eq!(a, b);
        assert!((0.1..=0.4).contains(&a));
        // Different category, different score
        assert_ne!(a, pseudo_score("Другая категория", text));
    }

    #[tokio::test]
    async fn test_set_threshold_moves_result_to_undefined() {
        let classifier = classifier(0.05);
        let text = "Добрый день! Прошу уточнить условия оплаты по договору №5678.";
        let defined = classifier.classify(text).await.unwrap();
        assert!(!defined.is_undefined());

        classifier.clear_cache();
        classifier.set_threshold(0.99);
        let undefined = classifier.classify(text).await.unwrap();
        assert!(undefined.is_undefined());
        // Same distribution either way
        assert_eq!(defined.scores, undefined.scores);
    }
}

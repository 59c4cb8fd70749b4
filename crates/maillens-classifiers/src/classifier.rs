//! Classifier trait and common result types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maillens_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trait for all classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text against the configured category set.
    ///
    /// Implementations never surface input or model failures as `Err`;
    /// degraded results carry an undefined outcome or a fallback method tag
    /// instead.
    async fn classify(&self, text: &str) -> Result<Classification>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Adjust the confidence threshold, clamped to [0.01, 0.99]
    fn set_threshold(&self, threshold: f32);
}

/// Which scoring path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Zero-shot scoring against the embedding model
    Embedding,
    /// Rule-based scoring, used when no model is loaded
    Heuristic,
    /// Rule-based scoring after a per-call embedding failure
    Fallback,
    /// Input rejected before scoring (too short)
    InputValidation,
    /// No categories configured
    NoCategories,
}

/// Why a result was marked undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UndefinedReason {
    /// Winning probability fell below the configured threshold
    BelowThreshold,
    /// The winning label is the reserved "not defined" sentinel
    SentinelCategory,
    /// Trimmed input was shorter than the minimum length
    InputTooShort,
    /// The category set was empty
    NoCategories,
}

/// Outcome of a classification: either a confident assignment or an
/// explicit "no category applies" marker. Distinct from an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum Outcome {
    Classified,
    Undefined { reason: UndefinedReason },
}

/// One ranked entry in the top-N list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    /// Probability after softmax normalization
    pub score: f32,
    /// Raw cosine similarity (equals `score` for heuristic results)
    pub similarity: f32,
}

/// Result of a classification call
///
/// Immutable once produced. The `scores` map is a probability distribution
/// over all configured categories and sums to 1.0; `confidence` equals its
/// maximum value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Winning category label
    pub category: String,

    /// Probability mass of the winning category, in [0, 1]
    pub confidence: f32,

    /// Classified or explicitly undefined
    pub outcome: Outcome,

    /// Top-N categories by probability, descending
    pub top: Vec<CategoryScore>,

    /// Probability per category, summing to 1.0
    pub scores: BTreeMap<String, f32>,

    /// Raw similarity per category
    pub similarities: BTreeMap<String, f32>,

    /// Scoring path that produced this result
    pub method: Method,

    /// Model identity (embedding model name or the heuristic's label)
    pub model: String,

    /// Whether this result was served from the cache
    pub cached: bool,

    /// When the result was produced
    pub timestamp: DateTime<Utc>,

    /// Wall-clock latency of the call in microseconds
    pub latency_us: u64,
}

impl Classification {
    /// Whether no category was confidently applicable
    pub fn is_undefined(&self) -> bool {
        matches!(self.outcome, Outcome::Undefined { .. })
    }

    /// Fixed result for input below the minimum length
    pub fn input_too_short(latency_us: u64) -> Self {
        Self::degenerate(
            "Текст слишком короткий",
            UndefinedReason::InputTooShort,
            Method::InputValidation,
            latency_us,
        )
    }

    /// Fixed result for an empty category set
    pub fn no_categories(latency_us: u64) -> Self {
        Self::degenerate(
            "Категории не заданы",
            UndefinedReason::NoCategories,
            Method::NoCategories,
            latency_us,
        )
    }

    fn degenerate(
        category: &str,
        reason: UndefinedReason,
        method: Method,
        latency_us: u64,
    ) -> Self {
        Self {
            category: category.to_string(),
            confidence: 0.0,
            outcome: Outcome::Undefined { reason },
            top: Vec::new(),
            scores: BTreeMap::new(),
            similarities: BTreeMap::new(),
            method,
            model: "none".to_string(),
            cached: false,
            timestamp: Utc::now(),
            latency_us,
        }
    }

    /// Build a full result from a probability distribution.
    ///
    /// `scores` must already be normalized; `similarities` is parallel to it.
    /// Selects the argmax, applies the threshold/sentinel rules, and ranks
    /// the top `top_n` entries.
    pub fn from_distribution(
        scores: Vec<(String, f32)>,
        similarities: Vec<(String, f32)>,
        threshold: f32,
        top_n: usize,
        method: Method,
        model: impl Into<String>,
        latency_us: u64,
    ) -> Self {
        let (best_category, best_prob) = scores
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, p)| (c.clone(), *p))
            .unwrap_or_else(|| ("Not Defined".to_string(), 0.0));

        let outcome = if crate::config::is_sentinel_label(&best_category) {
            Outcome::Undefined {
                reason: UndefinedReason::SentinelCategory,
            }
        } else if best_prob < threshold {
            Outcome::Undefined {
                reason: UndefinedReason::BelowThreshold,
            }
        } else {
            Outcome::Classified
        };

        let similarity_map: BTreeMap<String, f32> = similarities.into_iter().collect();

        let mut ranked: Vec<(String, f32)> = scores.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let top = ranked
            .into_iter()
            .take(top_n)
            .map(|(category, score)| {
                let similarity = similarity_map.get(&category).copied().unwrap_or(score);
                CategoryScore {
                    category,
                    score,
                    similarity,
                }
            })
            .collect();

        Self {
            category: best_category,
            confidence: best_prob,
            outcome,
            top,
            scores: scores.into_iter().collect(),
            similarities: similarity_map,
            method,
            model: model.into(),
            cached: false,
            timestamp: Utc::now(),
            latency_us,
        }
    }
}

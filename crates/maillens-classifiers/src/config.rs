//! Configuration for classifiers and the category set

use serde::{Deserialize, Serialize};

/// Labels that mark the reserved "undefined" sentinel category,
/// matched as case-insensitive substrings.
const SENTINEL_MARKERS: &[&str] = &["not defined", "не определен"];

/// Whether a category label denotes the reserved undefined sentinel.
pub fn is_sentinel_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    SENTINEL_MARKERS.iter().any(|m| lower.contains(m))
}

/// Clamp a threshold to its valid range.
pub fn clamp_threshold(threshold: f32) -> f32 {
    threshold.clamp(0.01, 0.99)
}

/// Configuration for a classifier instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Hugging Face model id for the embedding backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Confidence threshold below which results are undefined
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// How many ranked alternatives to return
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Temperature factor applied to similarities before softmax
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Check and populate the classification cache
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Minimum trimmed input length in characters
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Inputs longer than this are truncated before scoring
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// At most this many few-shot examples feed a category's representative
    /// embedding
    #[serde(default = "default_max_few_shot")]
    pub max_few_shot: usize,
}

fn default_model() -> String {
    "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string()
}

fn default_threshold() -> f32 {
    0.35
}

fn default_top_n() -> usize {
    3
}

fn default_temperature() -> f32 {
    5.0
}

fn default_use_cache() -> bool {
    true
}

fn default_min_text_length() -> usize {
    10
}

fn default_max_text_length() -> usize {
    10_000
}

fn default_max_few_shot() -> usize {
    3
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            threshold: default_threshold(),
            top_n: default_top_n(),
            temperature: default_temperature(),
            use_cache: default_use_cache(),
            min_text_length: default_min_text_length(),
            max_text_length: default_max_text_length(),
            max_few_shot: default_max_few_shot(),
        }
    }
}

/// An ordered set of category labels.
///
/// Labels are trimmed and deduplicated on insertion; insertion order is
/// preserved for display and tie-breaking, scoring itself is
/// order-independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet {
    labels: Vec<String>,
}

impl CategorySet {
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut set = Self::default();
        for label in labels {
            set.insert(label.into());
        }
        set
    }

    /// The default domain categories plus the reserved sentinel.
    pub fn default_categories() -> Self {
        Self::new([
            "Деловое предложение",
            "Жалоба клиента",
            "Техническая поддержка",
            "Финансовый запрос",
            "Спам / Реклама",
            "HR / Рекрутинг",
            "Юридическое письмо",
            "Новости / Анонсы",
            "Маркетинг / Продажи",
            "Личное сообщение",
            "Не определена",
        ])
    }

    /// Insert a label, trimming whitespace. Empty and duplicate labels are
    /// silently dropped.
    pub fn insert(&mut self, label: impl AsRef<str>) {
        let trimmed = label.as_ref().trim();
        if trimmed.is_empty() {
            return;
        }
        if !self.labels.iter().any(|l| l == trimmed) {
            self.labels.push(trimmed.to_string());
        }
    }

    pub fn remove(&mut self, label: &str) {
        self.labels.retain(|l| l != label);
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Stable signature over the sorted label set, for cache keys.
    pub fn signature(&self) -> String {
        let mut sorted: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.join("\u{1f}")
    }
}

impl<S: Into<String>> FromIterator<S> for CategorySet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

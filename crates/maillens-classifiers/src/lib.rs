//! MailLens Classifiers
//!
//! Zero-shot email classification over a configurable category set.
//!
//! The primary engine scores text against category descriptions (or few-shot
//! examples) with a sentence-embedding model; when the model is unavailable
//! or an inference call fails, a keyword/rule-based heuristic produces a
//! result of the same shape. Every classification yields a well-formed
//! result with an explicit undefined flag — never an error to the caller.

pub mod cache;
pub mod candle;
pub mod classifier;
pub mod config;
pub mod embedder;
pub mod embedding;
pub mod heuristic;

pub use cache::ClassificationCache;
pub use candle::CandleEmbedder;
pub use classifier::{
    CategoryScore, Classification, Classifier, Method, Outcome, UndefinedReason,
};
pub use config::{CategorySet, ClassifierConfig};
pub use embedder::Embedder;
pub use embedding::{EmbeddingClassifier, ModelInfo};
pub use heuristic::{HeuristicClassifier, HeuristicScorer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{Classification, Classifier, Method, Outcome};
    pub use crate::config::{CategorySet, ClassifierConfig};
    pub use crate::embedder::Embedder;
    pub use crate::embedding::EmbeddingClassifier;
    pub use crate::heuristic::HeuristicClassifier;
}

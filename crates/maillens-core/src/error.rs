//! Error types for MailLens

/// Result type alias using MailLens's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for MailLens operations
///
/// None of these are fatal in the core: classifiers recover locally by
/// degrading to heuristic scoring, and the benchmark harness records
/// per-sample failures as data instead of aborting the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Classifier execution errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Embedding backend errors (model missing, inference failure)
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Labeled dataset loading errors
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tabular input/output errors
    #[error("csv error: {0}")]
    Csv(String),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a new dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new csv error
    pub fn csv(msg: impl Into<String>) -> Self {
        Self::Csv(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

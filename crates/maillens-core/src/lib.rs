//! MailLens Core
//!
//! Core types and utilities shared across MailLens components.
//!
//! This crate provides:
//! - Error types and result handling
//! - Email text cleaning and sanitization
//! - Deterministic lexical/statistical feature extraction

pub mod error;
pub mod features;
pub mod text;

pub use error::{Error, Result};
pub use features::{TextFeatureExtractor, TextFeatures};
pub use text::{clean_email_text, detect_language, sanitize, Language};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::features::{TextFeatureExtractor, TextFeatures};
    pub use crate::text::{clean_email_text, sanitize, Language};
}

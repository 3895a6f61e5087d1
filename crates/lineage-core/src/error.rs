//! Centralized error types for Lineage.

use thiserror::Error;

/// Main error type for extraction and inference.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to read sample from '{collection}': {reason}")]
    SampleRead { collection: String, reason: String },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Unsupported source language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid identifier '{0}': expected ASCII letters, digits or '_'")]
    InvalidIdentifier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a sample read error.
    pub fn sample_read(collection: impl Into<String>, reason: impl ToString) -> Self {
        Self::SampleRead {
            collection: collection.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a parse error.
    pub fn parse(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

//! Error types for the pipeline crate.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a document run.
///
/// Completion failures never appear here: every stage that calls the
/// service degrades to a fallback instead of failing the run.
#[derive(Error, Debug)]
pub enum Error {
    /// The document could not be chunked (empty text, bad sizing).
    #[error("chunking failed: {0}")]
    Chunking(#[from] precis_chunker::Error),

    /// Pipeline settings are inconsistent.
    #[error("invalid pipeline configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A schema document uses a construct the validator does not support.
    #[error("invalid schema at {path}: {reason}")]
    InvalidSchema { path: String, reason: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid schema error.
    pub fn invalid_schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

//! Error types for the chunker crate.

use thiserror::Error;

/// Result type for chunking operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing or chunking a document.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The document has no content left to chunk.
    #[error("document '{name}' has no text to chunk")]
    EmptyDocument { name: String },

    /// Chunk sizing parameters are inconsistent.
    #[error("invalid chunker configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an empty document error.
    pub fn empty_document(name: impl Into<String>) -> Self {
        Self::EmptyDocument { name: name.into() }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

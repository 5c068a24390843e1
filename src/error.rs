//! Application-level errors for ingestion, persistence and orchestration.

use thiserror::Error;

/// Errors raised at the application edges.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem or record parsing failure.
    #[error(transparent)]
    Core(#[from] precis_core::Error),

    /// Pipeline failure (empty document, invalid pipeline config).
    #[error(transparent)]
    Pipeline(#[from] precis_pipeline::Error),

    /// Completion gateway construction or configuration failure.
    #[error(transparent)]
    Completion(#[from] precis_completion::Error),

    /// Chunker configuration failure.
    #[error(transparent)]
    Chunker(#[from] precis_chunker::Error),

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("file watcher failed: {reason}")]
    Watch { reason: String },

    /// The document queue no longer accepts work.
    #[error("document queue is closed")]
    QueueClosed,
}

impl Error {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn watch(reason: impl Into<String>) -> Self {
        Self::Watch {
            reason: reason.into(),
        }
    }
}

impl From<notify::Error> for Error {
    fn from(error: notify::Error) -> Self {
        Self::watch(error.to_string())
    }
}

/// Result alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

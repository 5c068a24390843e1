//! Error types for the completion crate.

use thiserror::Error;

/// Result type for completion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the completion service.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to connect to the completion service.
    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// A call did not finish within its timeout budget.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The service answered with a non-success HTTP status.
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode response: {reason}")]
    Decode { reason: String },

    /// Every attempt in the retry budget failed.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<Error> },

    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest response body kept in a [`Error::Status`] message.
const MAX_BODY_CHARS: usize = 512;

impl Error {
    /// Create a connection failed error.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub const fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create a status error, truncating long bodies.
    pub fn status(status: u16, body: impl AsRef<str>) -> Self {
        Self::Status {
            status,
            body: body.as_ref().chars().take(MAX_BODY_CHARS).collect(),
        }
    }

    /// Create a decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Wrap the last failure once the retry budget is spent.
    pub fn retries_exhausted(attempts: u32, last: Self) -> Self {
        Self::RetriesExhausted {
            attempts,
            last: Box::new(last),
        }
    }

    /// Create a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Map a transport-level reqwest failure onto the error taxonomy.
    pub fn transport(error: reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            Self::timeout(timeout_ms)
        } else if error.is_connect() {
            Self::connection_failed(error.to_string())
        } else if error.is_decode() {
            Self::decode(error.to_string())
        } else {
            Self::Http(error)
        }
    }

    /// Check if this error is retryable.
    ///
    /// Transport failures, timeouts, non-success statuses and undecodable
    /// bodies are all worth another attempt.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
                | Self::Status { .. }
                | Self::Decode { .. }
                | Self::Http(_)
                | Self::Json(_)
        )
    }

    /// Check if this error came from a timeout, which earns a longer backoff cap.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            Self::RetriesExhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::connection_failed("refused").is_retryable());
        assert!(Error::timeout(100).is_retryable());
        assert!(Error::status(503, "busy").is_retryable());
        assert!(Error::status(400, "bad request").is_retryable());
        assert!(Error::decode("not json").is_retryable());
        assert!(!Error::config_error("missing url").is_retryable());
        assert!(!Error::retries_exhausted(3, Error::timeout(1)).is_retryable());
    }

    #[test]
    fn test_timeout_classification() {
        assert!(Error::timeout(120_000).is_timeout());
        assert!(Error::retries_exhausted(3, Error::timeout(1)).is_timeout());
        assert!(!Error::status(500, "").is_timeout());
    }

    #[test]
    fn test_status_body_is_truncated() {
        let long = "x".repeat(5_000);
        assert!(matches!(
            Error::status(500, long),
            Error::Status { ref body, .. } if body.len() == MAX_BODY_CHARS
        ));
    }

    #[test]
    fn test_exhausted_message_includes_last_error() {
        let error = Error::retries_exhausted(3, Error::status(502, "gateway"));
        let message = error.to_string();
        assert!(message.contains("3 attempts"));
        assert!(message.contains("502"));
    }
}

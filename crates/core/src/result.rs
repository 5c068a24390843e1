//! Result type definition and extension traits for Railway-Oriented Programming.
//!
//! Provides logging combinators for Result types, enabling clean error handling
//! without unwrap/expect/panic.

use crate::error::Error;

/// The standard Result type for core operations.
///
/// # Examples
///
/// ```ignore
/// fn load(path: &Path) -> Result<String> {
///     std::fs::read_to_string(path)
///         .map_err(|e| Error::file_read_failed(path, e.to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing logging combinators for Results.
///
/// Used at the edges where a failure must be recorded but must not stop
/// sibling work (one unreadable summary file, one bad document).
pub trait ResultExt<T> {
    /// Convert a Result to an Option, logging the error if present.
    fn into_option_logged(self) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn into_option_logged(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Operation failed: {}", e);
                None
            }
        }
    }
}

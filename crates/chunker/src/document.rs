//! Input document representation for chunking
//!
//! Design by Contract:
//! - Invariants: name is non-empty; text is valid UTF-8
//! - Precondition: text comes from an upstream extractor (already plain text)
//! - Postcondition: all fields immutable after construction

use serde::{Deserialize, Serialize};

/// A document handed to one pipeline run.
///
/// Owned exclusively by that run and discarded once the run completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifying name supplied by the upstream collaborator (usually a file name).
    pub name: String,

    /// Raw extracted text.
    pub text: String,
}

impl Document {
    /// Create a new document
    ///
    /// # Examples
    ///
    /// ```
    /// use precis_chunker::Document;
    ///
    /// let doc = Document::new("circular-42.txt", "The circular is withdrawn.");
    /// assert_eq!(doc.name, "circular-42.txt");
    /// assert_eq!(doc.char_len(), 26);
    /// ```
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// A document is valid when it has a name and non-blank text.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.text.trim().is_empty()
    }

    /// Length of the raw text in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_creation() {
        let doc = Document::new("test-doc", "This is test content.");
        assert_eq!(doc.name, "test-doc");
        assert!(doc.is_valid());
    }

    #[test]
    fn test_document_validation() {
        assert!(!Document::new("", "content").is_valid());
        assert!(!Document::new("name", "   \n\n ").is_valid());
    }

    #[test]
    fn test_char_len_counts_unicode_scalars() {
        let doc = Document::new("unicode", "emoji 🎉 and CJK 中文");
        assert_eq!(doc.char_len(), 18);
        assert!(doc.text.len() > doc.char_len());
    }
}

//! Chunk sizing configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::preprocess::PreprocessOptions;

/// Sizing parameters for [`crate::chunk_text`].
///
/// All sizes are measured in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Texts no longer than this (after health scaling) are sent as a single chunk.
    #[serde(default = "default_base_chunk_size")]
    pub base_chunk_size: usize,

    /// Lower bound for the effective chunk size.
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    /// Upper bound for the effective chunk size.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Number of trailing sentences re-seeded into the next chunk.
    #[serde(default = "default_overlap_sentences")]
    pub overlap_sentences: usize,

    /// Optional hard cap on the number of chunks.
    #[serde(default)]
    pub max_chunks: Option<usize>,

    /// Cleanup applied before chunking.
    #[serde(default)]
    pub preprocess: PreprocessOptions,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            base_chunk_size: default_base_chunk_size(),
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            overlap_sentences: default_overlap_sentences(),
            max_chunks: None,
            preprocess: PreprocessOptions::default(),
        }
    }
}

impl ChunkerConfig {
    /// Create a config with explicit size bounds; the base size defaults to `max`.
    #[must_use]
    pub fn with_bounds(min_chunk_size: usize, max_chunk_size: usize) -> Self {
        Self {
            base_chunk_size: max_chunk_size,
            min_chunk_size,
            max_chunk_size,
            ..Default::default()
        }
    }

    /// Set the single-chunk threshold.
    #[must_use]
    pub const fn base_size(mut self, size: usize) -> Self {
        self.base_chunk_size = size;
        self
    }

    /// Set the number of overlap sentences.
    #[must_use]
    pub const fn overlap(mut self, sentences: usize) -> Self {
        self.overlap_sentences = sentences;
        self
    }

    /// Set the hard cap on chunk count.
    #[must_use]
    pub const fn max_chunks(mut self, cap: usize) -> Self {
        self.max_chunks = Some(cap);
        self
    }

    /// Replace the preprocessing options.
    #[must_use]
    pub const fn preprocess(mut self, options: PreprocessOptions) -> Self {
        self.preprocess = options;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when a bound is zero or the bounds are
    /// not ordered `min <= base <= max`.
    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_size == 0 {
            return Err(Error::invalid_config("min_chunk_size must be greater than 0"));
        }

        if self.min_chunk_size > self.max_chunk_size {
            return Err(Error::invalid_config(format!(
                "min_chunk_size ({}) exceeds max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            )));
        }

        if self.base_chunk_size < self.min_chunk_size || self.base_chunk_size > self.max_chunk_size
        {
            return Err(Error::invalid_config(format!(
                "base_chunk_size ({}) must lie within [{}, {}]",
                self.base_chunk_size, self.min_chunk_size, self.max_chunk_size
            )));
        }

        if self.max_chunks == Some(0) {
            return Err(Error::invalid_config("max_chunks must be greater than 0"));
        }

        Ok(())
    }
}

const fn default_base_chunk_size() -> usize {
    12_000
}

const fn default_min_chunk_size() -> usize {
    2_000
}

const fn default_max_chunk_size() -> usize {
    24_000
}

const fn default_overlap_sentences() -> usize {
    2
}

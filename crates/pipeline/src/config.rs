//! Orchestrator settings.

use serde::{Deserialize, Serialize};

use precis_completion::SamplingParams;

use crate::error::{Error, Result};

/// How chunk summaries are combined into one working summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Hierarchical above the threshold, flat otherwise.
    #[default]
    Auto,
    /// One merge call over all summaries.
    Flat,
    /// Batch merges, then a merge of the batch outputs.
    Hierarchical,
}

/// Shape of the final summary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Markdown prose.
    #[default]
    Prose,
    /// A JSON document validated against the declared schema.
    Structured,
}

impl OutputMode {
    /// Format tag stored in the persisted record.
    pub const fn format_tag(self) -> &'static str {
        match self {
            Self::Prose => "markdown",
            Self::Structured => "json",
        }
    }
}

/// Sampling parameters for each stage that calls the service.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageSampling {
    #[serde(default)]
    pub summarize: SamplingParams,
    #[serde(default)]
    pub merge: SamplingParams,
    #[serde(default)]
    pub continuation: SamplingParams,
    #[serde(default)]
    pub polish: SamplingParams,
}

/// Configuration for [`crate::Summarizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum in-flight per-chunk summarization calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub merge_strategy: MergeStrategy,

    /// Chunk counts above this use hierarchical merge under [`MergeStrategy::Auto`].
    #[serde(default = "default_hierarchical_threshold")]
    pub hierarchical_threshold: usize,

    /// Summaries per first-pass batch in hierarchical merge.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum continuation calls for a truncated merge result.
    #[serde(default = "default_continuation_attempts")]
    pub continuation_attempts: usize,

    /// Leading characters of a chunk used as its degraded summary.
    #[serde(default = "default_fallback_excerpt_chars")]
    pub fallback_excerpt_chars: usize,

    /// Joins chunk summaries when they are concatenated.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Run the phrasing-only polish stage.
    #[serde(default = "default_true")]
    pub polish: bool,

    /// Deterministic mode: never merge, always concatenate.
    #[serde(default)]
    pub mock: bool,

    #[serde(default)]
    pub output: OutputMode,

    #[serde(default)]
    pub sampling: StageSampling,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            merge_strategy: MergeStrategy::default(),
            hierarchical_threshold: default_hierarchical_threshold(),
            batch_size: default_batch_size(),
            continuation_attempts: default_continuation_attempts(),
            fallback_excerpt_chars: default_fallback_excerpt_chars(),
            separator: default_separator(),
            polish: true,
            mock: false,
            output: OutputMode::default(),
            sampling: StageSampling::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the concurrency limit.
    #[must_use]
    pub const fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit;
        self
    }

    /// Set the merge strategy.
    #[must_use]
    pub const fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    /// Set the hierarchical batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Enable or disable mock mode.
    #[must_use]
    pub const fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }

    /// Enable or disable the polish stage.
    #[must_use]
    pub const fn with_polish(mut self, polish: bool) -> Self {
        self.polish = polish;
        self
    }

    /// Set the output mode.
    #[must_use]
    pub const fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Whether `chunk_count` summaries should be merged hierarchically.
    pub const fn use_hierarchical(&self, chunk_count: usize) -> bool {
        match self.merge_strategy {
            MergeStrategy::Flat => false,
            MergeStrategy::Hierarchical => true,
            MergeStrategy::Auto => chunk_count > self.hierarchical_threshold,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the concurrency limit, batch
    /// size or fallback excerpt length is zero.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::invalid_config("concurrency must be greater than 0"));
        }
        if self.batch_size < 2 {
            return Err(Error::invalid_config("batch_size must be at least 2"));
        }
        if self.fallback_excerpt_chars == 0 {
            return Err(Error::invalid_config(
                "fallback_excerpt_chars must be greater than 0",
            ));
        }
        Ok(())
    }
}

const fn default_concurrency() -> usize {
    4
}

const fn default_hierarchical_threshold() -> usize {
    8
}

const fn default_batch_size() -> usize {
    4
}

const fn default_continuation_attempts() -> usize {
    3
}

const fn default_fallback_excerpt_chars() -> usize {
    400
}

fn default_separator() -> String {
    "\n\n".to_string()
}

const fn default_true() -> bool {
    true
}

//! Stage identifiers and the per-run records they produce.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One phase of a document run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Chunking,
    PerChunkSummarize,
    MergeDecision,
    Merge,
    SkipMerge,
    ContinuationCheck,
    Polish,
    Finalize,
    Done,
}

impl Stage {
    /// Stable snake-case name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Chunking => "chunking",
            Self::PerChunkSummarize => "per_chunk_summarize",
            Self::MergeDecision => "merge_decision",
            Self::Merge => "merge",
            Self::SkipMerge => "skip_merge",
            Self::ContinuationCheck => "continuation_check",
            Self::Polish => "polish",
            Self::Finalize => "finalize",
            Self::Done => "done",
        }
    }

    /// Whether `next` may follow `self` in a run.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Chunking, Self::PerChunkSummarize)
                | (Self::PerChunkSummarize, Self::MergeDecision)
                | (Self::MergeDecision, Self::Merge | Self::SkipMerge)
                | (Self::Merge | Self::SkipMerge, Self::ContinuationCheck)
                | (Self::ContinuationCheck, Self::Polish | Self::Finalize)
                | (Self::Polish, Self::Finalize)
                | (Self::Finalize, Self::Done)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The summary of one chunk. Exactly one exists per chunk, same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub index: usize,
    pub text: String,
    /// True when `text` is a raw-content excerpt rather than a model summary.
    pub degraded: bool,
}

impl ChunkSummary {
    /// A genuine model summary.
    pub fn genuine(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            degraded: false,
        }
    }

    /// A fallback excerpt substituted after the service failed.
    pub fn fallback(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            degraded: true,
        }
    }
}

/// A stage that fell back to its best available partial result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub stage: Stage,
    /// Chunk index for per-chunk degradations.
    pub chunk_index: Option<usize>,
    pub reason: String,
}

impl Degradation {
    pub fn stage(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            chunk_index: None,
            reason: reason.into(),
        }
    }

    pub fn chunk(index: usize, reason: impl Into<String>) -> Self {
        Self {
            stage: Stage::PerChunkSummarize,
            chunk_index: Some(index),
            reason: reason.into(),
        }
    }
}

/// Ordered record of the stages one run passed through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTrace {
    stages: Vec<Stage>,
}

impl StageTrace {
    /// Record entry into `stage`, logging transitions the state machine does not allow.
    pub fn enter(&mut self, stage: Stage) {
        if let Some(&previous) = self.stages.last() {
            if !previous.can_transition_to(stage) {
                tracing::warn!(from = %previous, to = %stage, "Unexpected stage transition");
            }
        }
        tracing::debug!(stage = %stage, "Entering stage");
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

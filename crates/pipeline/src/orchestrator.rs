//! Drives one document through every stage.
//!
//! Design by Contract:
//! - Precondition: the document has non-blank text
//! - Postcondition: one summary per chunk, same indices; the final text is
//!   non-empty and ends in terminal punctuation (or is valid JSON in
//!   structured mode)
//! - Invariant: no completion failure aborts a run; failing stages fall back
//!   to their best partial result and are listed in `degradations`

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};
use ulid::Ulid;

use precis_chunker::classify::char_len;
use precis_chunker::{ChunkPlan, ChunkStrategy, ChunkerConfig, Document, chunk_text, preprocess};
use precis_completion::{CompletionService, HealthStatus};

use crate::config::{OutputMode, PipelineConfig};
use crate::error::Result;
use crate::stage::{ChunkSummary, Degradation, Stage, StageTrace};
use crate::stages::continuation::continue_if_truncated;
use crate::stages::finalize::finalize;
use crate::stages::merge::{concatenate, merge_summaries};
use crate::stages::polish::polish;
use crate::stages::summarize::summarize_chunks;

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Ulid,
    pub document_name: String,
    /// The finalized summary text.
    pub summary: String,
    /// Character length of the document as supplied.
    pub source_length: usize,
    pub output: OutputMode,
    pub plan: ChunkPlan,
    pub strategy: ChunkStrategy,
    pub chunk_summaries: Vec<ChunkSummary>,
    pub continuation_calls: usize,
    pub degradations: Vec<Degradation>,
    pub removed_artifacts: Vec<String>,
    pub health: HealthStatus,
    pub trace: StageTrace,
}

impl RunReport {
    /// Number of chunks the document was split into.
    pub fn chunk_count(&self) -> usize {
        self.chunk_summaries.len()
    }

    /// Whether any stage fell back to a partial result.
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// The multi-stage summarization pipeline.
#[derive(Clone)]
pub struct Summarizer {
    service: Arc<dyn CompletionService>,
    chunker: ChunkerConfig,
    config: PipelineConfig,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("chunker", &self.chunker)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Summarizer {
    /// Create a summarizer.
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid.
    pub fn new(
        service: Arc<dyn CompletionService>,
        chunker: ChunkerConfig,
        config: PipelineConfig,
    ) -> Result<Self> {
        chunker.validate()?;
        config.validate()?;
        Ok(Self {
            service,
            chunker,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Summarize one document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Chunking`] when the document has no text left
    /// to chunk. Completion failures never surface here.
    pub async fn run(&self, document: &Document) -> Result<RunReport> {
        let run_id = Ulid::new();
        let span = info_span!("summarize", run_id = %run_id, document = %document.name);
        self.run_stages(run_id, document).instrument(span).await
    }

    async fn run_stages(&self, run_id: Ulid, document: &Document) -> Result<RunReport> {
        let service = self.service.as_ref();
        let config = &self.config;
        let mut trace = StageTrace::default();
        let mut degradations = Vec::new();

        trace.enter(Stage::Chunking);
        let source_length = char_len(&document.text);
        let prepared = preprocess(&document.text, &self.chunker.preprocess);
        let health = service.probe().await;
        let chunking = chunk_text(&prepared.text, &self.chunker, health.multiplier).map_err(
            |e| match e {
                precis_chunker::Error::EmptyDocument { .. } => {
                    precis_chunker::Error::empty_document(&document.name)
                }
                other => other,
            },
        )?;
        info!(
            source_length,
            chunks = chunking.chunks.len(),
            strategy = ?chunking.strategy,
            effective_size = chunking.plan.effective_size,
            multiplier = health.multiplier,
            "Document chunked"
        );

        trace.enter(Stage::PerChunkSummarize);
        let (chunk_summaries, chunk_degradations) =
            summarize_chunks(service, &chunking.chunks, config).await;
        degradations.extend(chunk_degradations);

        trace.enter(Stage::MergeDecision);
        let skip_merge = config.mock || chunk_summaries.len() <= 2;

        let (working, reported_truncated, check_continuation) = if skip_merge {
            trace.enter(Stage::SkipMerge);
            info!(chunks = chunk_summaries.len(), mock = config.mock, "Skipping merge");
            (concatenate(&chunk_summaries, &config.separator), false, false)
        } else {
            trace.enter(Stage::Merge);
            let merged = merge_summaries(service, &chunk_summaries, config).await;
            degradations.extend(merged.degradations);
            (merged.text, merged.reported_truncated, !merged.fell_back)
        };

        trace.enter(Stage::ContinuationCheck);
        let (working, continuation_calls) = if check_continuation {
            let outcome = continue_if_truncated(service, working, reported_truncated, config).await;
            degradations.extend(outcome.degradation);
            (outcome.text, outcome.calls)
        } else {
            (working, 0)
        };

        let working = if config.polish && !config.mock && config.output == OutputMode::Prose {
            trace.enter(Stage::Polish);
            let (polished, degradation) = polish(service, working, config).await;
            degradations.extend(degradation);
            polished
        } else {
            working
        };

        trace.enter(Stage::Finalize);
        let summary = finalize(&working, config.output);
        trace.enter(Stage::Done);

        if degradations.is_empty() {
            info!(chars = summary.len(), "Summary complete");
        } else {
            warn!(
                chars = summary.len(),
                degradations = degradations.len(),
                "Summary complete with degraded stages"
            );
        }

        Ok(RunReport {
            run_id,
            document_name: document.name.clone(),
            summary,
            source_length,
            output: config.output,
            plan: chunking.plan,
            strategy: chunking.strategy,
            chunk_summaries,
            continuation_calls,
            degradations,
            removed_artifacts: prepared.removed,
            health,
            trace,
        })
    }
}

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # precis-pipeline
//!
//! Multi-stage summarization of one document through a bounded-prompt
//! completion service.
//!
//! ```text
//! Chunking -> PerChunkSummarize -> MergeDecision -> {Merge | SkipMerge}
//!          -> ContinuationCheck -> Polish -> Finalize -> Done
//! ```
//!
//! # Design Principles
//!
//! - **Degrade, never abort**: a failed chunk gets an excerpt, a failed merge
//!   gets the concatenation, a failed polish keeps the unpolished text
//! - **Order is an invariant**: summary `i` always belongs to chunk `i`
//! - **Sequential after fan-out**: only per-chunk calls run concurrently

pub mod assemble;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod stage;
pub mod stages;

// Re-export commonly used items
pub use assemble::{Assembly, FinalSummary, RECORD_VERSION, SummaryRecord, assemble};
pub use config::{MergeStrategy, OutputMode, PipelineConfig, StageSampling};
pub use error::{Error, Result};
pub use orchestrator::{RunReport, Summarizer};
pub use schema::{SchemaNode, Violation, regulatory_schema, regulatory_schema_document};
pub use stage::{ChunkSummary, Degradation, Stage, StageTrace};

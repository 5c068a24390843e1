#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # precis
//!
//! Chunked, multi-stage summarization of long documents.
//!
//! The workspace crates do the work: `precis-chunker` splits text,
//! `precis-completion` talks to the model, `precis-pipeline` runs the
//! stages and assembles records. This crate adds the application edges:
//! configuration, file ingestion, the document queue, the directory
//! watcher and record persistence.

pub mod app;
pub mod config;
pub mod error;
pub mod ingest;
pub mod queue;
pub mod store;
pub mod watcher;

pub use app::{App, Processed, build_service};
pub use config::{AppConfig, QueueConfig};
pub use error::{Error, Result};
pub use queue::{DocumentHandler, DocumentQueue, DocumentReady, Dispatcher, QueueStats};
pub use store::{ListedSummary, SummaryStore};
pub use watcher::{DirectoryWatcher, watch_directory};

pub use precis_chunker;
pub use precis_completion;
pub use precis_core;
pub use precis_pipeline;

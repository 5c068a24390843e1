//! # precis-chunker
//!
//! Splits long document text into an ordered list of bounded segments that
//! respect heading and paragraph boundaries and carry a short sentence-level
//! overlap from one segment into the next.
//!
//! Pure functions only: no I/O, no completion calls.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod chunk;
pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod preprocess;

pub use chunk::{Chunk, ChunkPlan, ChunkStrategy, Chunking, chunk_text, plan_chunks};
pub use config::ChunkerConfig;
pub use document::Document;
pub use error::{Error, Result};
pub use preprocess::{PreprocessOptions, Preprocessed, preprocess};

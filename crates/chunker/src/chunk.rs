//! Core chunking types and algorithm
//!
//! Design by Contract:
//! - Precondition: text is non-blank, config is valid, multiplier in (0, 1]
//! - Postcondition: at least one chunk, indices `0..n` in document order, every
//!   chunk non-empty, `n` never above the configured hard cap
//! - Invariant: every semantic unit lands in exactly one chunk's primary content;
//!   overlap seeds are extra context, never primary content
//! - Invariant: a semantic chunk exceeds the effective size only when it is a
//!   single oversized unit; seeds shrink or vanish to stay within it
//!
//! Known limitations:
//! - A single unit longer than the effective size is emitted as its own
//!   oversized chunk rather than being force-split.
//! - The uniform-slicing fallback merges trailing slices with a space to honour
//!   the target count; the merged slice is not re-checked against `max_chunk_size`.

use serde::{Deserialize, Serialize};
use tap::Pipe;
use tracing::debug;

use crate::classify::{char_len, split_sentences, split_units, trailing_sentences};
use crate::config::ChunkerConfig;
use crate::error::{Error, Result};

const UNIT_JOINER: &str = "\n\n";

/// A bounded text segment handed to one per-chunk summarization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in document order (0-based).
    pub index: usize,

    /// Full text sent to the model: overlap seed (if any) followed by primary content.
    pub content: String,

    /// Trailing sentences carried over from the previous chunk.
    pub overlap: Option<String>,
}

impl Chunk {
    /// The content this chunk owns, without the inherited overlap seed.
    pub fn primary(&self) -> &str {
        self.overlap
            .as_deref()
            .and_then(|seed| self.content.strip_prefix(seed))
            .map_or(self.content.as_str(), str::trim_start)
    }

    /// Length of the full content in characters.
    pub fn char_len(&self) -> usize {
        char_len(&self.content)
    }
}

/// How the chunks of one document were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStrategy {
    /// The whole text fit under the base size.
    Single,
    /// Greedy packing of heading/paragraph units with sentence overlap.
    Semantic,
    /// Sentence-bounded uniform slicing after the semantic pass overshot the target.
    UniformSlices,
}

/// Sizing decisions derived from the text length, config and health multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// Text length in characters.
    pub text_len: usize,
    /// Balanced target number of chunks (already clamped to the hard cap).
    pub target_count: usize,
    /// Effective chunk size in characters after health scaling.
    pub effective_size: usize,
    /// Health multiplier that was applied.
    pub multiplier: f64,
}

/// Chunks plus the plan and strategy that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunking {
    pub chunks: Vec<Chunk>,
    pub plan: ChunkPlan,
    pub strategy: ChunkStrategy,
}

/// Derive the target chunk count and effective chunk size.
///
/// The target count is the geometric mean of the counts implied by the max and
/// min sizes, clamped to the hard cap. The effective size is the length split
/// evenly across that count, clamped to `[min, max]`, then shrunk by the health
/// multiplier (never below `min`).
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn plan_chunks(text_len: usize, config: &ChunkerConfig, multiplier: f64) -> ChunkPlan {
    let len = text_len.max(1);
    let by_max = len.div_ceil(config.max_chunk_size.max(1));
    let by_min = len.div_ceil(config.min_chunk_size.max(1));

    let balanced = ((by_max as f64) * (by_min as f64)).sqrt().round() as usize;
    let target_count = config
        .max_chunks
        .map_or(balanced, |cap| balanced.min(cap))
        .max(1);

    let multiplier = if multiplier.is_finite() {
        multiplier.clamp(f64::EPSILON, 1.0)
    } else {
        1.0
    };

    let effective_size = len
        .div_ceil(target_count)
        .clamp(config.min_chunk_size, config.max_chunk_size)
        .pipe(|size| ((size as f64) * multiplier).floor() as usize)
        .max(config.min_chunk_size);

    ChunkPlan {
        text_len,
        target_count,
        effective_size,
        multiplier,
    }
}

/// Split text into bounded, overlapping chunks.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for inconsistent sizing and
/// [`Error::EmptyDocument`] when the text is blank.
///
/// # Example
///
/// ```
/// use precis_chunker::{ChunkerConfig, chunk_text};
///
/// let config = ChunkerConfig::with_bounds(100, 1_000);
/// let chunking = chunk_text("A short note.", &config, 1.0).unwrap();
/// assert_eq!(chunking.chunks.len(), 1);
/// ```
pub fn chunk_text(text: &str, config: &ChunkerConfig, multiplier: f64) -> Result<Chunking> {
    config.validate()?;

    let text = text.trim();
    if text.is_empty() {
        return Err(Error::empty_document("<text>"));
    }

    let plan = plan_chunks(char_len(text), config, multiplier);

    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let single_limit = ((config.base_chunk_size as f64) * plan.multiplier).floor() as usize;

    let (pieces, strategy) = if plan.text_len <= single_limit.max(config.min_chunk_size) {
        (vec![Piece::primary(text)], ChunkStrategy::Single)
    } else {
        let semantic = pack_units(text, plan.effective_size, config.overlap_sentences);
        if semantic.len() > plan.target_count {
            debug!(
                produced = semantic.len(),
                target = plan.target_count,
                "Semantic packing overshot target, using uniform slices"
            );
            (
                uniform_slices(text, plan.effective_size, plan.target_count),
                ChunkStrategy::UniformSlices,
            )
        } else {
            (semantic, ChunkStrategy::Semantic)
        }
    };

    let chunks: Vec<Chunk> = pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| Chunk {
            index,
            content: piece.content,
            overlap: piece.overlap,
        })
        .collect();

    debug!(
        chunks = chunks.len(),
        target = plan.target_count,
        effective_size = plan.effective_size,
        strategy = ?strategy,
        "Chunked text"
    );

    Ok(Chunking {
        chunks,
        plan,
        strategy,
    })
}

/// A chunk under construction.
#[derive(Debug)]
struct Piece {
    content: String,
    overlap: Option<String>,
}

impl Piece {
    fn primary(text: &str) -> Self {
        Self {
            content: text.to_string(),
            overlap: None,
        }
    }
}

/// Greedily pack semantic units into pieces of at most `size` characters.
///
/// When a unit does not fit, the buffer is flushed and the unit starts the
/// next buffer, preceded by as many of the flushed buffer's trailing sentences
/// (up to `overlap_sentences`) as still fit within `size`.
fn pack_units(text: &str, size: usize, overlap_sentences: usize) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;
    let mut seed: Option<String> = None;

    for unit in split_units(text, size) {
        let unit_len = char_len(unit);

        if buffer.is_empty() {
            buffer.push_str(unit);
            buffer_len = unit_len;
            continue;
        }

        let candidate_len = buffer_len
            .saturating_add(UNIT_JOINER.len())
            .saturating_add(unit_len);
        if candidate_len <= size {
            buffer.push_str(UNIT_JOINER);
            buffer.push_str(unit);
            buffer_len = candidate_len;
            continue;
        }

        let room = size.saturating_sub(unit_len.saturating_add(UNIT_JOINER.len()));
        let next_seed = fitting_seed(&buffer, overlap_sentences, room);
        pieces.push(Piece {
            content: std::mem::take(&mut buffer),
            overlap: seed.take(),
        });

        buffer = match next_seed.as_deref() {
            Some(s) => format!("{s}{UNIT_JOINER}{unit}"),
            None => unit.to_string(),
        };
        buffer_len = char_len(&buffer);
        seed = next_seed;
    }

    if !buffer.is_empty() {
        pieces.push(Piece {
            content: buffer,
            overlap: seed,
        });
    }

    pieces
}

/// The longest tail of at most `max_sentences` sentences of `buffer` that
/// fits in `room` characters.
fn fitting_seed(buffer: &str, max_sentences: usize, room: usize) -> Option<String> {
    (1..=max_sentences)
        .rev()
        .filter_map(|count| trailing_sentences(buffer, count))
        .find(|seed| char_len(seed) <= room)
}

/// Slice the whole text at sentence boundaries into pieces of about `size`
/// characters, then merge trailing slices pairwise until at most `target`
/// remain.
fn uniform_slices(text: &str, size: usize, target: usize) -> Vec<Piece> {
    let mut slices: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = char_len(sentence);
        if !current.is_empty() && current_len.saturating_add(1).saturating_add(sentence_len) > size
        {
            slices.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len = current_len.saturating_add(1);
        }
        current.push_str(sentence);
        current_len = current_len.saturating_add(sentence_len);
    }
    if !current.is_empty() {
        slices.push(current);
    }

    while slices.len() > target.max(1) {
        match (slices.pop(), slices.pop()) {
            (Some(last), Some(previous)) => slices.push(format!("{previous} {last}")),
            (Some(last), None) => {
                slices.push(last);
                break;
            }
            _ => break,
        }
    }

    slices
        .into_iter()
        .map(|content| Piece {
            content,
            overlap: None,
        })
        .collect()
}

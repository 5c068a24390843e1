//! Per-chunk summarization under a bounded concurrency limit.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use precis_chunker::Chunk;
use precis_chunker::classify::ensure_terminal_punctuation;
use precis_completion::CompletionService;

use crate::config::PipelineConfig;
use crate::prompts::chunk_messages;
use crate::stage::{ChunkSummary, Degradation};
use crate::stages::usable;

/// Summarize every chunk, returning exactly one summary per chunk in index order.
///
/// Calls run concurrently up to `config.concurrency`; results are collected
/// in submission order, so summary `i` always belongs to chunk `i`. A chunk
/// whose call fails is given a fallback excerpt and a degradation record.
pub async fn summarize_chunks(
    service: &dyn CompletionService,
    chunks: &[Chunk],
    config: &PipelineConfig,
) -> (Vec<ChunkSummary>, Vec<Degradation>) {
    let total = chunks.len();

    let calls: Vec<_> = chunks
        .iter()
        .map(|chunk| summarize_one(service, chunk, total, config))
        .collect();

    let results: Vec<(ChunkSummary, Option<Degradation>)> = stream::iter(calls)
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    let (summaries, degradations): (Vec<_>, Vec<_>) = results.into_iter().unzip();
    (summaries, degradations.into_iter().flatten().collect())
}

async fn summarize_one(
    service: &dyn CompletionService,
    chunk: &Chunk,
    total: usize,
    config: &PipelineConfig,
) -> (ChunkSummary, Option<Degradation>) {
    let messages = chunk_messages(&chunk.content, chunk.index, total);
    match usable(service.complete(&messages, &config.sampling.summarize).await) {
        Ok(completion) => {
            debug!(chunk_index = chunk.index, chars = completion.text.len(), "Chunk summarized");
            (ChunkSummary::genuine(chunk.index, completion.text), None)
        }
        Err(reason) => {
            warn!(chunk_index = chunk.index, reason = %reason, "Chunk summary degraded to excerpt");
            (
                ChunkSummary::fallback(
                    chunk.index,
                    fallback_excerpt(chunk.primary(), config.fallback_excerpt_chars),
                ),
                Some(Degradation::chunk(chunk.index, reason)),
            )
        }
    }
}

/// The leading `max_chars` characters of `content`, cut back to a word
/// boundary when truncated, whitespace-collapsed and ending in punctuation.
pub fn fallback_excerpt(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");

    let excerpt = match collapsed.char_indices().nth(max_chars) {
        None => collapsed.as_str(),
        Some((cut, _)) => {
            let head = collapsed.get(..cut).unwrap_or(&collapsed);
            head.rfind(' ')
                .and_then(|space| head.get(..space))
                .filter(|h| !h.is_empty())
                .unwrap_or(head)
        }
    };

    ensure_terminal_punctuation(excerpt)
}

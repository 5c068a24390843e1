//! Merge chunk summaries into one working summary.
//!
//! Flat merge sends every summary in one call. Hierarchical merge merges
//! fixed-size batches first, then merges the batch outputs; order is kept
//! within and across batches. Calls run one at a time.

use itertools::Itertools;
use tracing::{info, warn};

use precis_completion::CompletionService;

use crate::config::PipelineConfig;
use crate::prompts::merge_messages;
use crate::stage::{ChunkSummary, Degradation, Stage};
use crate::stages::usable;

/// Result of the merge stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub text: String,
    /// The service reported the final merge call as cut off by the token budget.
    pub reported_truncated: bool,
    /// True when `text` is the plain concatenation fallback.
    pub fell_back: bool,
    pub degradations: Vec<Degradation>,
}

/// Join summaries in index order with the configured separator.
pub fn concatenate(summaries: &[ChunkSummary], separator: &str) -> String {
    summaries
        .iter()
        .sorted_by_key(|s| s.index)
        .map(|s| s.text.trim())
        .join(separator)
}

/// Merge `summaries` with the strategy chosen for their count.
pub async fn merge_summaries(
    service: &dyn CompletionService,
    summaries: &[ChunkSummary],
    config: &PipelineConfig,
) -> MergeOutcome {
    let ordered: Vec<&str> = summaries
        .iter()
        .sorted_by_key(|s| s.index)
        .map(|s| s.text.trim())
        .collect();

    let mut degradations = Vec::new();

    let inputs: Vec<String> = if config.use_hierarchical(ordered.len()) {
        let batches = merge_batches(service, &ordered, config, &mut degradations).await;
        info!(
            summaries = ordered.len(),
            batches = batches.len(),
            "Hierarchical merge first pass complete"
        );
        batches
    } else {
        ordered.iter().map(|s| (*s).to_string()).collect()
    };

    let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
    let messages = merge_messages(&refs, &config.separator, config.output);

    match usable(service.complete(&messages, &config.sampling.merge).await) {
        Ok(completion) => MergeOutcome {
            reported_truncated: completion.is_truncated(),
            text: completion.text,
            fell_back: false,
            degradations,
        },
        Err(reason) => {
            warn!(reason = %reason, "Merge failed, using concatenated chunk summaries");
            degradations.push(Degradation::stage(Stage::Merge, reason));
            MergeOutcome {
                text: concatenate(summaries, &config.separator),
                reported_truncated: false,
                fell_back: true,
                degradations,
            }
        }
    }
}

/// First hierarchical pass: one merge per batch, in order.
///
/// A single-summary batch passes through unchanged. A failed batch
/// contributes its own concatenation instead.
async fn merge_batches(
    service: &dyn CompletionService,
    ordered: &[&str],
    config: &PipelineConfig,
    degradations: &mut Vec<Degradation>,
) -> Vec<String> {
    let mut outputs = Vec::new();

    for (batch_index, batch) in ordered.chunks(config.batch_size.max(2)).enumerate() {
        if let [only] = batch {
            outputs.push((*only).to_string());
            continue;
        }

        let messages = merge_messages(batch, &config.separator, config.output);
        match usable(service.complete(&messages, &config.sampling.merge).await) {
            Ok(completion) => outputs.push(completion.text),
            Err(reason) => {
                warn!(batch_index, reason = %reason, "Batch merge failed, concatenating batch");
                degradations.push(Degradation::stage(
                    Stage::Merge,
                    format!("batch {batch_index}: {reason}"),
                ));
                outputs.push(batch.join(&config.separator));
            }
        }
    }

    outputs
}

//! Truncation detection and recovery for the merge result.

use tracing::{debug, info, warn};

use precis_chunker::classify::ends_with_terminal_punctuation;
use precis_completion::CompletionService;

use crate::config::{OutputMode, PipelineConfig};
use crate::prompts::continuation_messages;
use crate::stage::{Degradation, Stage};
use crate::stages::finalize::strip_code_fences;
use crate::stages::usable;

/// Result of the continuation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationOutcome {
    pub text: String,
    /// Continuation calls that returned text.
    pub calls: usize,
    /// Whether the text no longer looks truncated.
    pub complete: bool,
    pub degradation: Option<Degradation>,
}

/// Whether `text` looks cut off.
///
/// Prose is truncated when the service said so or the text lacks terminal
/// punctuation; structured output when the service said so or the text is
/// not a parsable JSON document.
pub fn looks_truncated(text: &str, reported: bool, output: OutputMode) -> bool {
    if reported {
        return true;
    }
    match output {
        OutputMode::Prose => !ends_with_terminal_punctuation(text),
        OutputMode::Structured => {
            serde_json::from_str::<serde_json::Value>(&strip_code_fences(text)).is_err()
        }
    }
}

/// Append a continuation to `base`.
///
/// A continuation restates the final word of `base`. When its first word
/// extends that word, the two are spliced, so a word cut mid-way is rejoined
/// instead of split by a space. Otherwise a space is inserted only between
/// two words.
pub fn join_continuation(base: &str, addition: &str) -> String {
    let addition = addition.trim_end();

    let stem = base.trim_end_matches(char::is_alphanumeric);
    let fragment = base.get(stem.len()..).unwrap_or_default();
    let lead = addition.trim_start();
    if !fragment.is_empty() && lead.starts_with(fragment) {
        return format!("{stem}{lead}");
    }

    let needs_space = !base.ends_with(char::is_whitespace)
        && !addition.starts_with(char::is_whitespace)
        && !addition.starts_with([',', '.', ';', ':', '!', '?', ')', ']']);

    if needs_space {
        format!("{base} {addition}")
    } else {
        format!("{base}{addition}")
    }
}

/// Issue up to `config.continuation_attempts` continuation calls while the
/// text looks truncated, appending each one.
pub async fn continue_if_truncated(
    service: &dyn CompletionService,
    text: String,
    reported_truncated: bool,
    config: &PipelineConfig,
) -> ContinuationOutcome {
    let mut text = text;
    let mut truncated = looks_truncated(&text, reported_truncated, config.output);
    let mut calls = 0usize;

    if !truncated {
        debug!("Merge result is complete, no continuation needed");
    }

    for attempt in 1..=config.continuation_attempts {
        if !truncated {
            break;
        }

        info!(attempt, chars = text.len(), "Merge result looks truncated, requesting continuation");
        let messages = continuation_messages(&text);

        match usable(service.complete(&messages, &config.sampling.continuation).await) {
            Ok(completion) => {
                calls = calls.saturating_add(1);
                text = join_continuation(&text, &completion.text);
                truncated = looks_truncated(&text, completion.is_truncated(), config.output);
            }
            Err(reason) => {
                warn!(attempt, reason = %reason, "Continuation failed, keeping text as is");
                return ContinuationOutcome {
                    text,
                    calls,
                    complete: false,
                    degradation: Some(Degradation::stage(Stage::ContinuationCheck, reason)),
                };
            }
        }
    }

    if truncated {
        warn!(calls, "Continuation budget exhausted, text still looks truncated");
    }

    ContinuationOutcome {
        text,
        calls,
        complete: !truncated,
        degradation: None,
    }
}

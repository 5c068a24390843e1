//! Stage implementations.
//!
//! Each stage that calls the completion service turns a failed or malformed
//! call into a [`crate::stage::Degradation`] and a fallback value, so no
//! stage can abort a run.

pub mod continuation;
pub mod finalize;
pub mod merge;
pub mod polish;
pub mod summarize;

use precis_completion::{Completion, CompletionOutcome};

/// Reduce a service result to usable completion text or a failure reason.
pub(crate) fn usable(
    result: precis_completion::Result<CompletionOutcome>,
) -> std::result::Result<Completion, String> {
    match result {
        Ok(CompletionOutcome::Completed(completion)) => Ok(completion),
        Ok(CompletionOutcome::Malformed { reason }) => Err(format!("malformed response: {reason}")),
        Err(e) => Err(e.to_string()),
    }
}

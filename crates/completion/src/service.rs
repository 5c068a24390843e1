//! The completion-service seam.
//!
//! The pipeline only ever talks to a `dyn CompletionService`. [`crate::Gateway`]
//! is the HTTP implementation; [`OfflineService`] is a deterministic stand-in
//! used when no model endpoint is available.

use async_trait::async_trait;

use crate::error::Result;
use crate::health::HealthStatus;
use crate::types::{Completion, CompletionOutcome, Message, Role, SamplingParams};

/// One bounded request/response exchange with a completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one request, retrying transient failures internally.
    ///
    /// # Errors
    ///
    /// Returns an error once the retry budget is exhausted or on a
    /// non-retryable failure. A decodable response without text is
    /// `Ok(CompletionOutcome::Malformed)`, not an error.
    async fn complete(
        &self,
        messages: &[Message],
        params: &SamplingParams,
    ) -> Result<CompletionOutcome>;

    /// Probe service health (throttled) and return the current status.
    async fn probe(&self) -> HealthStatus {
        HealthStatus::default()
    }
}

/// Deterministic extractive stand-in for a model.
///
/// Answers with the leading sentences of the last user message, so a run
/// completes without network access and repeated runs are byte-identical.
#[derive(Debug, Clone, Copy)]
pub struct OfflineService {
    sentences: usize,
}

impl Default for OfflineService {
    fn default() -> Self {
        Self { sentences: 3 }
    }
}

impl OfflineService {
    /// Answer with at most `sentences` leading sentences.
    pub const fn new(sentences: usize) -> Self {
        Self { sentences }
    }

    fn extract(&self, text: &str) -> String {
        let mut taken = 0usize;
        let mut end = text.len();
        let mut chars = text.char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            if !matches!(ch, '.' | '!' | '?') {
                continue;
            }
            let at_boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
            if at_boundary {
                taken = taken.saturating_add(1);
                if taken >= self.sentences {
                    end = idx.saturating_add(ch.len_utf8());
                    break;
                }
            }
        }

        text.get(..end)
            .unwrap_or(text)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl CompletionService for OfflineService {
    async fn complete(
        &self,
        messages: &[Message],
        _params: &SamplingParams,
    ) -> Result<CompletionOutcome> {
        let source = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str());

        let text = self.extract(source);
        if text.is_empty() {
            return Ok(CompletionOutcome::malformed("nothing to extract"));
        }
        Ok(CompletionOutcome::Completed(Completion::new(text)))
    }
}

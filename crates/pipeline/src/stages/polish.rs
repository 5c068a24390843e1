//! Phrasing-only rewrite of the working summary.

use tracing::{debug, warn};

use precis_completion::CompletionService;

use crate::config::PipelineConfig;
use crate::prompts::polish_messages;
use crate::stage::{Degradation, Stage};
use crate::stages::usable;

/// Polish `text`; on any failure the input is returned unchanged.
pub async fn polish(
    service: &dyn CompletionService,
    text: String,
    config: &PipelineConfig,
) -> (String, Option<Degradation>) {
    let messages = polish_messages(&text);

    match usable(service.complete(&messages, &config.sampling.polish).await) {
        Ok(completion) => {
            debug!(before = text.len(), after = completion.text.len(), "Summary polished");
            (completion.text, None)
        }
        Err(reason) => {
            warn!(reason = %reason, "Polish failed, keeping unpolished summary");
            (text, Some(Degradation::stage(Stage::Polish, reason)))
        }
    }
}

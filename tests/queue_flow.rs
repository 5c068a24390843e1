//! Integration tests for queued document processing.
//!
//! These tests verify that:
//! - Every readable document in a batch gets a persisted record
//! - An unreadable or empty document fails alone
//! - Listing returns the persisted records newest first

#![forbid(clippy::unwrap_used)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use precis::{App, AppConfig, QueueStats, queue};

fn mock_config(summary_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig {
        summary_dir: summary_dir.to_path_buf(),
        ..AppConfig::default()
    };
    config.pipeline.mock = true;
    config.queue.settle_delay = Duration::ZERO;
    config
}

const CIRCULAR: &str = "Circular 40\n\n\
The circular on liquidity reporting is withdrawn with effect from 30 June. \
Banks must submit the final return for the second quarter. \
Supervisors will confirm receipt in writing.\n\n\
The withdrawal does not affect obligations that arose before the effective date. \
Records must be kept for five years.";

/// Test that one bad document does not stop its siblings.
///
/// # GIVEN
/// Three queued files: two readable documents and one blank file
///
/// # WHEN
/// The queue drains
///
/// # THEN
/// Two records are persisted and one failure is counted
#[tokio::test]
async fn test_bad_document_fails_alone() -> Result<(), Box<dyn std::error::Error>> {
    let uploads = tempfile::tempdir()?;
    let summaries = tempfile::tempdir()?;
    std::fs::write(uploads.path().join("circular-40.txt"), CIRCULAR)?;
    std::fs::write(uploads.path().join("empty.txt"), "   \n\n  ")?;
    std::fs::write(uploads.path().join("notice.txt"), CIRCULAR.replace("40", "41"))?;

    let config = mock_config(summaries.path());
    let app = Arc::new(App::from_config(&config)?);
    let (documents, dispatcher) = queue::start(Arc::clone(&app), &config.queue);

    for name in ["circular-40.txt", "empty.txt", "notice.txt"] {
        documents.submit(uploads.path().join(name)).await?;
    }
    drop(documents);

    let stats = timeout(Duration::from_secs(10), dispatcher.finish())
        .await
        .map_err(|_| "Timeout waiting for queue to drain")?;
    assert_eq!(stats, QueueStats { succeeded: 2, failed: 1 });

    let listed = app.store().list()?;
    let mut names: Vec<&str> = listed.iter().map(|e| e.file_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["circular-40.txt", "notice.txt"]);
    assert!(summaries.path().join("circular-40.json").is_file());
    assert!(!summaries.path().join("empty.json").exists());
    Ok(())
}

/// Test that mock-mode records are reproducible.
///
/// # GIVEN
/// The same document processed twice in mock mode
///
/// # WHEN
/// Both records are read back
///
/// # THEN
/// The summary text is identical and ends in terminal punctuation
#[tokio::test]
async fn test_mock_mode_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
    let uploads = tempfile::tempdir()?;
    let path = uploads.path().join("circular-40.txt");
    std::fs::write(&path, CIRCULAR)?;

    let first_dir = tempfile::tempdir()?;
    let second_dir = tempfile::tempdir()?;
    let first = App::from_config(&mock_config(first_dir.path()))?.process_path(&path).await?;
    let second = App::from_config(&mock_config(second_dir.path()))?.process_path(&path).await?;

    assert_eq!(first.summary, second.summary);
    assert!(first.summary.ends_with('.'));
    assert!(!first.summary.contains("Circular 40\n"));
    Ok(())
}

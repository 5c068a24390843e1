//! Persistence and listing of summary records.
//!
//! Records are stored one per document as pretty-printed `<stem>.json`.
//! Listing also understands two older layouts: a top-level `finalSummary`
//! string, and a `summaries` array of per-chunk strings or raw completion
//! objects.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use precis_core::{Error, Result, ResultExt};
use precis_pipeline::{RECORD_VERSION, SummaryRecord};

/// Listed text of a record whose summary could not be interpreted.
pub const UNSUPPORTED_FORMAT: &str = "Summary not available in a supported format.";

/// Listed text of a file that is not valid JSON.
pub const UNPARSABLE_FILE: &str = "Could not parse summary file.";

/// One entry of [`SummaryStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedSummary {
    pub file_name: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListedSummary {
    fn unparsable(file_name: String, now: DateTime<Utc>) -> Self {
        Self {
            file_name,
            processed_at: Some(now),
            summary: UNPARSABLE_FILE.to_string(),
            error: Some("Invalid JSON format".to_string()),
        }
    }
}

/// Directory-backed record store.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    dir: PathBuf,
}

impl SummaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a record for `file_name` is written to.
    pub fn record_path(&self, file_name: &str) -> PathBuf {
        let stem = Path::new(file_name)
            .file_stem()
            .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());
        self.dir.join(format!("{stem}.json"))
    }

    /// Write `record`, replacing any earlier record for the same document.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub async fn save(&self, record: &SummaryRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::directory_creation_failed(&self.dir, e.to_string()))?;

        let path = self.record_path(&record.file_name);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::invalid_record(e.to_string()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Error::file_write_failed(&path, e.to_string()))?;

        info!(file_name = %record.file_name, path = %path.display(), "Summary saved");
        Ok(path)
    }

    /// Read every `.json` record, newest first by `processedAt`.
    ///
    /// Files that are not valid JSON become error entries; unreadable files
    /// are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryNotFound`] if the store directory is missing.
    pub fn list(&self) -> Result<Vec<ListedSummary>> {
        if !self.dir.is_dir() {
            return Err(Error::DirectoryNotFound {
                path: self.dir.clone(),
            });
        }

        let now = Utc::now();
        let mut entries: Vec<ListedSummary> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.map_err(Error::from).into_option_logged())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| read_entry(&path, now).into_option_logged())
            .collect();

        entries.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        debug!(count = entries.len(), dir = %self.dir.display(), "Listed summaries");
        Ok(entries)
    }
}

fn read_entry(path: &Path, now: DateTime<Utc>) -> Result<ListedSummary> {
    let content =
        std::fs::read_to_string(path).map_err(|e| Error::file_read_failed(path, e.to_string()))?;
    let json_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Ok(value) = serde_json::from_str::<Value>(&content) else {
        warn!(path = %path.display(), "Summary file is not valid JSON");
        return Ok(ListedSummary::unparsable(json_name, now));
    };

    let file_name = value
        .get("fileName")
        .and_then(Value::as_str)
        .map_or(json_name, ToString::to_string);
    let processed_at = value
        .get("processedAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc));

    let (summary, error) = match extract_summary_text(&value) {
        Some(text) => (text, None),
        None => {
            warn!(path = %path.display(), "Unknown summary format");
            (UNSUPPORTED_FORMAT.to_string(), Some("Unknown summary format".to_string()))
        }
    };

    Ok(ListedSummary {
        file_name,
        processed_at,
        summary,
        error,
    })
}

/// Pull the display text out of any known record layout.
pub fn extract_summary_text(record: &Value) -> Option<String> {
    match record.get("summary") {
        Some(Value::String(text)) => return Some(unwrap_embedded_record(text)),
        Some(Value::Object(summary)) => {
            let nested = summary
                .get("summary")
                .or_else(|| summary.get("executive_summary"))
                .and_then(Value::as_str);
            if let Some(text) = nested {
                return Some(text.to_string());
            }
        }
        _ => {}
    }

    if let Some(text) = record.get("finalSummary").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    record.get("summaries").and_then(Value::as_array).map(|chunks| {
        chunks
            .iter()
            .filter_map(|chunk| match chunk {
                Value::String(text) => Some(text.as_str()),
                other => other.pointer("/choices/0/message/content").and_then(Value::as_str),
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// A summary string may itself hold a serialized versioned record.
fn unwrap_embedded_record(text: &str) -> String {
    if !text.trim_start().starts_with('{') {
        return text.to_string();
    }

    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|inner| inner.get("version").and_then(Value::as_str) == Some(RECORD_VERSION))
        .and_then(|inner| inner.get("summary").and_then(Value::as_str).map(ToString::to_string))
        .unwrap_or_else(|| text.to_string())
}

//! Package a finished run as the persisted summary record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::OutputMode;
use crate::orchestrator::RunReport;
use crate::schema::{SchemaNode, Violation, regulatory_schema};
use crate::stages::finalize::strip_code_fences;

/// Version tag of records produced by this pipeline.
pub const RECORD_VERSION: &str = "2.0";

/// The summary part of a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSummary {
    pub version: String,
    pub format: String,
    pub summary: String,
    #[serde(with = "iso_millis")]
    pub generated_at: DateTime<Utc>,
    pub source_length: usize,
}

/// One persisted record per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub file_name: String,
    #[serde(with = "iso_millis")]
    pub processed_at: DateTime<Utc>,
    pub summary: FinalSummary,
}

/// A record plus any schema violations found while assembling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub record: SummaryRecord,
    /// Never blocks persistence; empty in prose mode.
    pub violations: Vec<Violation>,
}

/// Build the record for `report`.
///
/// In structured mode the summary is parsed as JSON and checked against
/// [`regulatory_schema`]; every violation is logged and returned.
pub fn assemble(file_name: &str, report: &RunReport, now: DateTime<Utc>) -> Assembly {
    let violations = match report.output {
        OutputMode::Prose => Vec::new(),
        OutputMode::Structured => match regulatory_schema() {
            Ok(schema) => validate_structured(&report.summary, &schema),
            Err(e) => vec![Violation {
                path: "$".to_string(),
                message: format!("schema unavailable: {e}"),
            }],
        },
    };

    for violation in &violations {
        warn!(
            file_name,
            path = %violation.path,
            message = %violation.message,
            "Summary does not conform to schema"
        );
    }

    Assembly {
        record: SummaryRecord {
            file_name: file_name.to_string(),
            processed_at: now,
            summary: FinalSummary {
                version: RECORD_VERSION.to_string(),
                format: report.output.format_tag().to_string(),
                summary: report.summary.clone(),
                generated_at: now,
                source_length: report.source_length,
            },
        },
        violations,
    }
}

/// Parse `text` as JSON and validate it against `schema`.
pub fn validate_structured(text: &str, schema: &SchemaNode) -> Vec<Violation> {
    match serde_json::from_str::<serde_json::Value>(&strip_code_fences(text)) {
        Ok(value) => schema.validate(&value),
        Err(e) => vec![Violation {
            path: "$".to_string(),
            message: format!("summary is not valid JSON: {e}"),
        }],
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Format a timestamp the way records store it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

//! Application configuration: a TOML file overlaid with environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use precis_chunker::ChunkerConfig;
use precis_completion::GatewayConfig;
use precis_completion::config::duration_millis;
use precis_pipeline::PipelineConfig;

use crate::error::{Error, Result};

/// Base chunk size in characters.
pub const ENV_CHUNK_SIZE: &str = "PDF_CHUNK_SIZE";
/// Sentences carried from one chunk into the next.
pub const ENV_CHUNK_OVERLAP: &str = "PDF_CHUNK_OVERLAP_SENTENCES";
/// Directory summary records are written to.
pub const ENV_SUMMARY_DIR: &str = "PRECIS_SUMMARY_DIR";
/// Use the offline service and skip merge/polish.
pub const ENV_MOCK: &str = "PRECIS_MOCK";

/// Document queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Documents summarized at the same time.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pending documents held before producers wait.
    #[serde(default = "default_backlog")]
    pub backlog: usize,

    /// Pause between detecting a file and reading it.
    #[serde(with = "duration_millis", default = "default_settle_delay")]
    pub settle_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backlog: default_backlog(),
            settle_delay: default_settle_delay(),
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Validate the queue settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when workers or backlog is zero.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_config("queue.workers must be greater than 0"));
        }
        if self.backlog == 0 {
            return Err(Error::invalid_config("queue.backlog must be greater than 0"));
        }
        Ok(())
    }
}

/// Top-level configuration for the `precis` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub chunker: ChunkerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    /// Where summary records are persisted.
    #[serde(default = "default_summary_dir")]
    pub summary_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            chunker: ChunkerConfig::default(),
            pipeline: PipelineConfig::default(),
            queue: QueueConfig::default(),
            summary_dir: default_summary_dir(),
        }
    }
}

impl AppConfig {
    /// Load the file at `path` (or defaults), apply the process environment
    /// and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, an environment
    /// override is malformed, or the merged configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let mut config = base.apply_overrides(|key| std::env::var(key).ok())?;
        config.gateway = config.gateway.apply_env()?;
        config.validate()?;

        debug!(
            api_url = %config.gateway.api_url,
            model = %config.gateway.model,
            summary_dir = %config.summary_dir.display(),
            mock = config.pipeline.mock,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns a core read or TOML parse error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| precis_core::Error::file_read_failed(path, e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| precis_core::Error::toml_parse_failed(e.to_string()).into())
    }

    /// Apply the chunking, summary directory and mock-mode overrides using
    /// `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when a numeric or boolean variable
    /// does not parse.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // The single-chunk threshold may sit above the default packing cap;
        // the cap rises with it.
        if let Some(size) = lookup(ENV_CHUNK_SIZE) {
            let size = parse_count(ENV_CHUNK_SIZE, &size)?;
            self.chunker.base_chunk_size = size;
            self.chunker.max_chunk_size = self.chunker.max_chunk_size.max(size);
        }

        if let Some(overlap) = lookup(ENV_CHUNK_OVERLAP) {
            self.chunker.overlap_sentences = parse_count(ENV_CHUNK_OVERLAP, &overlap)?;
        }

        if let Some(dir) = lookup(ENV_SUMMARY_DIR).filter(|d| !d.trim().is_empty()) {
            self.summary_dir = PathBuf::from(dir);
        }

        if let Some(mock) = lookup(ENV_MOCK) {
            self.pipeline.mock = parse_flag(ENV_MOCK, &mock)?;
        }

        Ok(self)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first section error found.
    pub fn validate(&self) -> Result<()> {
        self.gateway.validate()?;
        self.chunker.validate()?;
        self.pipeline.validate()?;
        self.queue.validate()
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| Error::invalid_config(format!("{key} must be a non-negative integer, got '{raw}'")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_config(format!("{key} must be a boolean, got '{raw}'"))),
    }
}

const fn default_workers() -> usize {
    2
}

const fn default_backlog() -> usize {
    64
}

const fn default_settle_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_summary_dir() -> PathBuf {
    PathBuf::from("summaries")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunker.base_chunk_size, 12_000);
        assert_eq!(config.chunker.min_chunk_size, 2_000);
        assert_eq!(config.chunker.max_chunk_size, 24_000);
        assert_eq!(config.queue.workers, 2);
        assert_eq!(config.summary_dir, PathBuf::from("summaries"));
    }

    #[test]
    fn test_partial_toml_file_keeps_defaults() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            r#"
summary_dir = "/var/lib/precis"

[gateway]
model = "qwen2.5-7b"
timeout = 60

[chunker]
max_chunks = 6

[pipeline]
concurrency = 8
output = "structured"

[queue]
workers = 3
settle_delay = 250
"#
        )?;

        let config = AppConfig::from_file(file.path())?;

        assert_eq!(config.summary_dir, PathBuf::from("/var/lib/precis"));
        assert_eq!(config.gateway.model, "qwen2.5-7b");
        assert_eq!(config.gateway.timeout, Duration::from_secs(60));
        assert_eq!(config.chunker.max_chunks, Some(6));
        assert_eq!(config.chunker.base_chunk_size, 12_000);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.pipeline.output, precis_pipeline::OutputMode::Structured);
        assert_eq!(config.queue.workers, 3);
        assert_eq!(config.queue.backlog, 64);
        assert_eq!(config.queue.settle_delay, Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn test_unreadable_file_is_core_error() {
        let result = AppConfig::from_file(Path::new("/nonexistent/precis.toml"));
        assert!(matches!(
            result,
            Err(Error::Core(precis_core::Error::FileReadFailed { .. }))
        ));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "queue = [not toml")?;

        let result = AppConfig::from_file(file.path());
        assert!(matches!(
            result,
            Err(Error::Core(precis_core::Error::TomlParseFailed { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_environment_overrides() -> Result<()> {
        let config = AppConfig::default().apply_overrides(lookup(&[
            (ENV_CHUNK_SIZE, "8000"),
            (ENV_CHUNK_OVERLAP, "1"),
            (ENV_SUMMARY_DIR, "/tmp/out"),
            (ENV_MOCK, "true"),
        ]))?;

        assert_eq!(config.chunker.base_chunk_size, 8_000);
        assert_eq!(config.chunker.overlap_sentences, 1);
        assert_eq!(config.summary_dir, PathBuf::from("/tmp/out"));
        assert!(config.pipeline.mock);
        Ok(())
    }

    #[test]
    fn test_missing_variables_leave_config_untouched() -> Result<()> {
        let config = AppConfig::default().apply_overrides(lookup(&[]))?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }

    #[test]
    fn test_malformed_override_is_rejected() {
        let result = AppConfig::default().apply_overrides(lookup(&[(ENV_CHUNK_SIZE, "large")]));
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = AppConfig::default().apply_overrides(lookup(&[(ENV_MOCK, "maybe")]));
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_zero_workers_is_invalid() {
        let config = AppConfig {
            queue: QueueConfig::default().with_workers(0),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_large_chunk_size_raises_max_bound() -> Result<()> {
        let config = AppConfig::default().apply_overrides(lookup(&[(ENV_CHUNK_SIZE, "50000")]))?;

        assert_eq!(config.chunker.base_chunk_size, 50_000);
        assert_eq!(config.chunker.max_chunk_size, 50_000);
        assert_eq!(config.chunker.min_chunk_size, 2_000);
        config.validate()?;
        Ok(())
    }

    #[test]
    fn test_chunk_size_within_bounds_keeps_max() -> Result<()> {
        let config = AppConfig::default().apply_overrides(lookup(&[(ENV_CHUNK_SIZE, "8000")]))?;
        assert_eq!(config.chunker.max_chunk_size, 24_000);
        Ok(())
    }

    #[test]
    fn test_chunk_size_below_min_fails_validation() -> Result<()> {
        let config = AppConfig::default().apply_overrides(lookup(&[(ENV_CHUNK_SIZE, "500")]))?;
        assert!(matches!(config.validate(), Err(Error::Chunker(_))));
        Ok(())
    }
}

//! Configuration for the completion gateway.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Configuration for [`crate::Gateway`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Chat-completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Endpoint for lightweight health probes; the completions endpoint when unset.
    #[serde(default)]
    pub probe_url: Option<Url>,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Hard per-call timeout.
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,

    /// Retry budget and backoff.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Minimum spacing between health probes.
    #[serde(with = "duration_secs", default = "default_probe_interval")]
    pub probe_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            probe_url: None,
            token: None,
            model: default_model(),
            timeout: default_timeout(),
            retry: RetryPolicy::default(),
            probe_interval: default_probe_interval(),
        }
    }
}

impl GatewayConfig {
    /// Create a config pointing at the given completions endpoint.
    pub fn with_api(api_url: Url) -> Self {
        Self {
            api_url,
            ..Default::default()
        }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the probe endpoint.
    #[must_use]
    pub fn probe_url(mut self, url: Url) -> Self {
        self.probe_url = Some(url);
        self
    }

    /// Set the minimum spacing between probes.
    #[must_use]
    pub const fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Where health probes are sent.
    pub fn probe_target(&self) -> &Url {
        self.probe_url.as_ref().unwrap_or(&self.api_url)
    }

    /// Timeout in whole milliseconds, for error reporting.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Apply `LLM_API_URL`, `API_TOKEN` and `LLM_MODEL_NAME` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UrlParse`] when `LLM_API_URL` is set but not a URL.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("LLM_API_URL") {
            self.api_url = url.parse()?;
        }

        if let Ok(token) = std::env::var("API_TOKEN") {
            if !token.trim().is_empty() {
                self.token = Some(token);
            }
        }

        if let Ok(model) = std::env::var("LLM_MODEL_NAME") {
            if !model.trim().is_empty() {
                self.model = model;
            }
        }

        Ok(self)
    }

    /// Load configuration from environment variables over the defaults.
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::apply_env`].
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env()
    }

    /// Load configuration from a JSON or TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file is unreadable and a parse error if it
    /// is not valid JSON/TOML for this struct.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|e| e == "json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            toml::from_str(&content)
                .map_err(|e| Error::config_error(format!("Failed to parse config: {e}")))
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for a zero timeout, an empty model name
    /// or an invalid retry policy.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::config_error("timeout must be greater than 0"));
        }
        if self.model.trim().is_empty() {
            return Err(Error::config_error("model must not be empty"));
        }
        self.retry.validate()
    }
}

#[expect(clippy::expect_used)]
fn default_api_url() -> Url {
    Url::parse("http://127.0.0.1:1234/v1/chat/completions")
        .expect("hardcoded default URL is valid")
}

fn default_model() -> String {
    "local-model".to_string()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

const fn default_probe_interval() -> Duration {
    Duration::from_secs(30)
}

/// Serialization helper for Duration as seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serialization helper for Duration as milliseconds.
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! HTTP gateway to an OpenAI-compatible chat-completions endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::health::{HealthMonitor, HealthStatus};
use crate::retry::retry_async;
use crate::service::CompletionService;
use crate::types::{ChatRequest, ChatResponse, CompletionOutcome, Message, SamplingParams};

/// Completion client with per-call timeout, retry/backoff and health probing.
#[derive(Debug, Clone)]
pub struct Gateway {
    /// Configuration for the gateway.
    config: Arc<GatewayConfig>,
    /// HTTP client shared by all calls.
    http_client: reqwest::Client,
    /// Process-wide health state.
    health: Arc<HealthMonitor>,
}

impl Gateway {
    /// Create a gateway with its own health monitor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an invalid config and
    /// [`Error::ConnectionFailed`] if the HTTP client cannot be built.
    pub fn with_config(config: GatewayConfig) -> Result<Self> {
        let health = Arc::new(HealthMonitor::new(config.probe_interval));
        Self::with_health(config, health)
    }

    /// Create a gateway that shares an existing health monitor.
    ///
    /// # Errors
    ///
    /// See [`Gateway::with_config`].
    pub fn with_health(config: GatewayConfig, health: Arc<HealthMonitor>) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::connection_failed(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
            health,
        })
    }

    /// The shared health monitor.
    pub fn health(&self) -> Arc<HealthMonitor> {
        Arc::clone(&self.health)
    }

    /// The gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Execute a single request attempt under the hard per-call timeout.
    async fn send_once(
        &self,
        messages: &[Message],
        params: &SamplingParams,
        attempt: u32,
    ) -> Result<CompletionOutcome> {
        let timeout_ms = self.config.timeout_ms();
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            params,
        };

        let mut builder = self
            .http_client
            .post(self.config.api_url.clone())
            .json(&request);
        if let Some(token) = self.config.token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        debug!(attempt, messages = messages.len(), "Sending completion request");
        let start = Instant::now();

        let exchange = async {
            let response = builder
                .send()
                .await
                .map_err(|e| Error::transport(e, timeout_ms))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| Error::transport(e, timeout_ms))?;
            Ok::<_, Error>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| Error::timeout(timeout_ms))??;

        if !status.is_success() {
            return Err(Error::status(status.as_u16(), body));
        }

        let latency = start.elapsed();
        let response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| Error::decode(e.to_string()))?;

        debug!(
            attempt,
            latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            "Completion response received"
        );
        Ok(response.into_outcome(latency))
    }

    /// One lightweight request to the probe target, returning its latency.
    ///
    /// Any answer below 500 counts as reachable: a completions endpoint
    /// typically rejects a bare GET with 404/405 while still being up.
    async fn ping(&self) -> Result<Duration> {
        let timeout_ms = self.config.timeout_ms();
        let start = Instant::now();

        let mut builder = self.http_client.get(self.config.probe_target().clone());
        if let Some(token) = self.config.token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = tokio::time::timeout(self.config.timeout, builder.send())
            .await
            .map_err(|_| Error::timeout(timeout_ms))?
            .map_err(|e| Error::transport(e, timeout_ms))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Error::status(status.as_u16(), "health probe"));
        }
        Ok(start.elapsed())
    }
}

#[async_trait]
impl CompletionService for Gateway {
    async fn complete(
        &self,
        messages: &[Message],
        params: &SamplingParams,
    ) -> Result<CompletionOutcome> {
        let outcome = retry_async(&self.config.retry, "complete", |attempt| {
            self.send_once(messages, params, attempt)
        })
        .await?;

        if let CompletionOutcome::Malformed { reason } = &outcome {
            info!(reason = %reason, "Completion response carried no text");
        }
        Ok(outcome)
    }

    async fn probe(&self) -> HealthStatus {
        self.health.probe_with(|| self.ping()).await
    }
}

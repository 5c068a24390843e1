//! Completion-service health tracking.
//!
//! Probes feed an exponential moving average of latency and a chunk-size
//! multiplier in `[0.5, 1.0]`. Slow probes shrink the multiplier, fast probes
//! grow it back by `0.1` per probe.
//!
//! The status lives behind a single mutex so concurrent probes cannot lose
//! updates to the average or the multiplier.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

/// Latency the moving average starts from.
pub const INITIAL_LATENCY_MS: f64 = 1_000.0;

/// Weight of the previous average in each update.
const EMA_DECAY: f64 = 0.7;

/// Probes slower than this shrink the multiplier.
const SLOW_LATENCY_MS: f64 = 2_000.0;

/// Latency range over which the multiplier falls from 1.0 to its floor.
const SLOWDOWN_SPAN_MS: f64 = 4_000.0;

pub const MIN_MULTIPLIER: f64 = 0.5;
pub const MAX_MULTIPLIER: f64 = 1.0;

/// Recovery step per fast probe.
const RECOVERY_STEP: f64 = 0.1;

/// Snapshot of completion-service health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// When the last probe was started.
    pub last_checked: Option<DateTime<Utc>>,
    /// Whether the last probe succeeded.
    pub healthy: bool,
    /// Failed probes since the last success.
    pub consecutive_failures: u32,
    /// Exponentially averaged probe latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Chunk-size multiplier derived from probe latency.
    pub multiplier: f64,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            last_checked: None,
            healthy: true,
            consecutive_failures: 0,
            avg_latency_ms: INITIAL_LATENCY_MS,
            multiplier: MAX_MULTIPLIER,
        }
    }
}

impl HealthStatus {
    /// Fold a successful probe into the status.
    #[expect(clippy::cast_precision_loss)]
    pub fn record_success(&mut self, latency: Duration) {
        let sample_ms = latency.as_millis() as f64;

        self.healthy = true;
        self.consecutive_failures = 0;
        self.avg_latency_ms = EMA_DECAY * self.avg_latency_ms + (1.0 - EMA_DECAY) * sample_ms;
        self.multiplier = if sample_ms > SLOW_LATENCY_MS {
            (1.0 - (sample_ms - SLOW_LATENCY_MS) / SLOWDOWN_SPAN_MS).max(MIN_MULTIPLIER)
        } else {
            (self.multiplier + RECOVERY_STEP).min(MAX_MULTIPLIER)
        };
    }

    /// Record a failed probe. The multiplier is left unchanged.
    pub fn record_failure(&mut self) {
        self.healthy = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Whether a probe is due at `now` given the minimum spacing.
    pub fn probe_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        let Some(last) = self.last_checked else {
            return true;
        };
        chrono::Duration::from_std(interval)
            .is_ok_and(|interval| now.signed_duration_since(last) >= interval)
    }
}

/// Process-wide, mutex-guarded [`HealthStatus`] with probe throttling.
#[derive(Debug)]
pub struct HealthMonitor {
    status: Mutex<HealthStatus>,
    interval: Duration,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl HealthMonitor {
    /// Create a monitor that probes at most once per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            status: Mutex::new(HealthStatus::default()),
            interval,
        }
    }

    /// Current status snapshot.
    pub async fn snapshot(&self) -> HealthStatus {
        self.status.lock().await.clone()
    }

    /// Current chunk-size multiplier.
    pub async fn multiplier(&self) -> f64 {
        self.status.lock().await.multiplier
    }

    /// Run `check` if a probe is due and fold its measured latency into the status.
    ///
    /// The probe slot is claimed under the lock before `check` runs, so
    /// concurrent callers inside one interval share a single probe.
    pub async fn probe_with<F, Fut>(&self, check: F) -> HealthStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Duration>>,
    {
        {
            let mut status = self.status.lock().await;
            let now = Utc::now();
            if !status.probe_due(now, self.interval) {
                debug!("Health probe skipped, checked recently");
                return status.clone();
            }
            status.last_checked = Some(now);
        }

        let outcome = check().await;

        let mut status = self.status.lock().await;
        match outcome {
            Ok(latency) => {
                status.record_success(latency);
                debug!(
                    latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    avg_latency_ms = status.avg_latency_ms,
                    multiplier = status.multiplier,
                    "Health probe succeeded"
                );
            }
            Err(e) => {
                status.record_failure();
                warn!(
                    error = %e,
                    consecutive_failures = status.consecutive_failures,
                    "Health probe failed"
                );
            }
        }
        status.clone()
    }
}

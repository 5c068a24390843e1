#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # precis-completion
//!
//! Gateway to an external chat-completion service that only accepts bounded
//! prompts.
//!
//! ## Features
//!
//! - One request/response exchange per call, under a hard timeout
//! - Exponential backoff retry with a longer cap for timeouts
//! - "Malformed response" sentinel for well-formed answers without text
//! - Throttled health probes feeding a chunk-size multiplier
//!
//! ## Example
//!
//! ```ignore
//! use precis_completion::{CompletionService, Gateway, GatewayConfig, Message, SamplingParams};
//!
//! let gateway = Gateway::with_config(GatewayConfig::from_env()?)?;
//! let health = gateway.probe().await;
//! let outcome = gateway
//!     .complete(&[Message::user("Summarize this.")], &SamplingParams::default())
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod retry;
pub mod service;
pub mod types;

// Re-export commonly used items
pub use client::Gateway;
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use health::{HealthMonitor, HealthStatus};
pub use retry::{RetryPolicy, retry_async};
pub use service::{CompletionService, OfflineService};
pub use types::{Completion, CompletionOutcome, FinishReason, Message, Role, SamplingParams};

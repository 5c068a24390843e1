//! Request and response types for chat-style completion calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role/content pair in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system instruction.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message (prior model output).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,

    #[serde(default)]
    pub presence_penalty: f32,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            frequency_penalty: default_frequency_penalty(),
            presence_penalty: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

impl SamplingParams {
    /// Set the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

const fn default_temperature() -> f32 {
    0.2
}

const fn default_top_p() -> f32 {
    0.9
}

const fn default_frequency_penalty() -> f32 {
    1.0
}

const fn default_max_tokens() -> u32 {
    1200
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Natural end of output.
    Stop,
    /// Output hit the token budget.
    Length,
    /// Any other reason reported by the service.
    Other(String),
}

impl FinishReason {
    /// Parse the wire value (`"stop"`, `"length"`, ...).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stop" | "eos" | "end_turn" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Generated text, trimmed.
    pub text: String,
    /// Finish reason, when the service reported one.
    pub finish_reason: Option<FinishReason>,
    /// Wall-clock time of the successful attempt.
    pub latency: Duration,
}

impl Completion {
    /// Create a completion that stopped naturally.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some(FinishReason::Stop),
            latency: Duration::ZERO,
        }
    }

    /// Set the finish reason.
    #[must_use]
    pub fn with_finish_reason(mut self, reason: Option<FinishReason>) -> Self {
        self.finish_reason = reason;
        self
    }

    /// Whether the service reported that output was cut off by the token budget.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == Some(FinishReason::Length)
    }
}

/// Result of one gateway call that reached the service and got a decodable answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// The service produced text.
    Completed(Completion),
    /// The response was well-formed but carried no usable text.
    Malformed { reason: String },
}

impl CompletionOutcome {
    /// Create a malformed-response sentinel.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// The completion, if the response carried one.
    pub fn completion(self) -> Option<Completion> {
        match self {
            Self::Completed(completion) => Some(completion),
            Self::Malformed { .. } => None,
        }
    }

    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(flatten)]
    pub params: &'a SamplingParams,
}

/// Chat-completions response body. Every field is optional on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    /// Legacy completions endpoints put the text here instead.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Turn the first choice into an outcome; missing or blank text is `Malformed`.
    pub fn into_outcome(self, latency: Duration) -> CompletionOutcome {
        let Some(choice) = self.choices.into_iter().next() else {
            return CompletionOutcome::malformed("response has no choices");
        };

        let text = choice
            .message
            .and_then(|m| m.content)
            .or(choice.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        match text {
            Some(text) => CompletionOutcome::Completed(Completion {
                text,
                finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
                latency,
            }),
            None => CompletionOutcome::malformed("first choice has no text"),
        }
    }
}

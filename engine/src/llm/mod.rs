//! Model Provider Abstraction Layer
//!
//! Common interface for the language-model collaborator used by the task
//! planner, delegation router, result synthesizer, memory-budget controller,
//! and the conversational executor. The `ModelProvider` trait is the narrow
//! seam behind which actual inference lives; everything in the engine treats
//! it as an opaque, possibly non-deterministic text function.
//!
//! Structured (JSON-constrained) decisions go through [`generate_json`],
//! which extracts a JSON object from whatever the model produced, retries
//! once with a corrective instruction on a malformed response, and only then
//! surfaces a [`ModelError::ResponseFormat`] for the caller's degraded path.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod openai;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur during model operations
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Malformed structured output: {0}")]
    ResponseFormat(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,

    /// Tool result message
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            "tool" => Ok(MessageRole::Tool),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

/// Model provider trait that all providers must implement
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Generate a plain-text completion for the given conversation
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Check if the provider is currently healthy and available.
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Generate a JSON-constrained decision from the model.
///
/// Calls `generate`, extracts the first JSON object from the response
/// (raw, fenced, or embedded in prose), and deserializes it into `T`.
/// A malformed response is retried exactly once with the offending output
/// and a corrective instruction appended; a second failure is returned as
/// `ModelError::ResponseFormat` so the caller can take its degraded path.
pub async fn generate_json<T: DeserializeOwned>(
    provider: &dyn ModelProvider,
    messages: &[Message],
) -> Result<T> {
    let first = provider.generate(messages).await?;
    match parse_json_object::<T>(&first) {
        Ok(value) => Ok(value),
        Err(parse_err) => {
            tracing::debug!(
                provider = provider.name(),
                error = %parse_err,
                "structured output malformed, retrying once"
            );

            let mut retry = messages.to_vec();
            retry.push(Message::assistant(&first));
            retry.push(Message::user(
                "That response was not valid JSON. Reply again with ONLY the \
                 JSON object, no markdown, no explanation.",
            ));

            let second = provider.generate(&retry).await?;
            parse_json_object::<T>(&second)
                .map_err(|e| ModelError::ResponseFormat(format!("{e}: {second}")))
        }
    }
}

/// Parse a JSON object of type `T` out of model output.
///
/// Handles the formats models actually emit:
/// 1. Raw JSON (the whole response is the object)
/// 2. Fenced JSON, with or without trailing prose
/// 3. JSON embedded in prose (first balanced `{...}` in the text)
fn parse_json_object<T: DeserializeOwned>(content: &str) -> std::result::Result<T, String> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<T>(inner.trim()) {
            return Ok(value);
        }
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(candidate) = extract_balanced_object(&trimmed[start..]) {
            return serde_json::from_str::<T>(candidate).map_err(|e| e.to_string());
        }
    }

    Err("no JSON object found in model output".to_string())
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_block(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

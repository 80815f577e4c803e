//! LLM types: provider-neutral response, errors, and the chat trait.

use crate::error::{ErrorCode, truncate};
use crate::message::Turn;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}{}", body_detail(.body))]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider declined to answer (safety block, recitation, ...).
    #[error("response blocked: {0}")]
    Blocked(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::Blocked(_) => "E_BLOCKED",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

fn body_detail(body: &str) -> String {
    let body = truncate(body);
    if body.is_empty() { body } else { format!(": {body}") }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Response from an LLM chat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// Concatenated text of the first candidate.
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// =============================================================================
// LLM CHAT TRAIT
// =============================================================================

/// Provider-neutral async trait for LLM chat. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmChat: Send + Sync {
    /// Model name requests are sent to.
    fn model(&self) -> &str;

    /// Send one message, with optional system instruction and prior turns.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails, the response is malformed,
    /// or the provider blocks the answer.
    async fn chat(&self, system: Option<&str>, history: &[Turn], message: &str) -> Result<ChatResponse, LlmError>;
}

//! Chat gateway: one user message in, one model reply out.
//!
//! DESIGN
//! ======
//! Two client-side variants implement [`ChatGateway`]:
//! - [`DirectGateway`] calls the upstream API with the locally stored key.
//! - [`RemoteGateway`] posts to the server's `/api/chat` pass-through.
//!
//! Gateways keep no history: callers re-supply prior turns on every call.
//! Each call is a single request with no retry.
//!
//! ERROR HANDLING
//! ==============
//! Failures come back as a typed [`GatewayError`] so callers can tell a
//! refusal from a dead network. Turning that into user-facing text
//! ([`APOLOGY`]) is the composer's job, not the gateway's.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ChatFailure, ChatReply, ChatRequest, ErrorBody};
use crate::credential::CredentialStore;
use crate::error::{ErrorCode, truncate};
use crate::llm::{LlmChat, LlmClient, LlmConfig, LlmError};
use crate::message::Turn;

/// Text shown in place of a reply when the gateway fails.
pub const APOLOGY: &str = "Sorry, I'm having trouble connecting to the AI service. Please try again.";

const REMOTE_TIMEOUT_SECS: u64 = 150;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no API key configured")]
    MissingCredential,

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("model declined to answer: {0}")]
    Refused(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::MissingCredential => "E_MISSING_CREDENTIAL",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Upstream { .. } => "E_UPSTREAM",
            Self::Refused(_) => "E_REFUSED",
            Self::MalformedResponse(_) => "E_MALFORMED_RESPONSE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Upstream { status: 429 | 500..=599, .. })
    }
}

impl From<LlmError> for GatewayError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey { .. } => Self::MissingCredential,
            LlmError::ApiRequest(msg) | LlmError::HttpClientBuild(msg) => Self::Transport(msg),
            LlmError::ApiResponse { status, body } => Self::Upstream { status, message: truncate(&body) },
            LlmError::ApiParse(msg) => Self::MalformedResponse(msg),
            LlmError::Blocked(reason) => Self::Refused(reason),
        }
    }
}

fn require_message(message: &str) -> Result<(), GatewayError> {
    if message.trim().is_empty() {
        return Err(GatewayError::InvalidInput("message must not be empty".into()));
    }
    Ok(())
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send `message` with prior `history`, returning the model's text.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] describing why no reply was produced.
    async fn send(&self, message: &str, history: &[Turn]) -> Result<String, GatewayError>;
}

// =============================================================================
// DIRECT
// =============================================================================

pub struct DirectGateway {
    llm: Arc<dyn LlmChat>,
}

impl DirectGateway {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmChat>) -> Self {
        Self { llm }
    }

    /// Build a gateway from the locally stored key using the direct profile.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingCredential`] when no key is stored, or
    /// [`GatewayError::Transport`] if storage or the HTTP client fails.
    pub fn from_credentials(credentials: &CredentialStore) -> Result<Self, GatewayError> {
        let key = credentials
            .load()
            .map_err(|e| GatewayError::Transport(e.to_string()))?
            .ok_or(GatewayError::MissingCredential)?;
        let client = LlmClient::from_config(&LlmConfig::direct(key))?;
        Ok(Self::new(Arc::new(client)))
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.llm.model()
    }
}

#[async_trait::async_trait]
impl ChatGateway for DirectGateway {
    async fn send(&self, message: &str, history: &[Turn]) -> Result<String, GatewayError> {
        require_message(message)?;
        let response = self.llm.chat(None, history, message).await?;
        tracing::debug!(
            model = %response.model,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "direct reply received"
        );
        Ok(response.text)
    }
}

// =============================================================================
// REMOTE
// =============================================================================

pub struct RemoteGateway {
    http: reqwest::Client,
    endpoint: String,
    system_prompt: Option<String>,
}

impl RemoteGateway {
    /// Gateway posting to `{base_url}/api/chat`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REMOTE_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { http, endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')), system_prompt: None })
    }

    /// Send this system instruction with every request.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatGateway for RemoteGateway {
    async fn send(&self, message: &str, history: &[Turn]) -> Result<String, GatewayError> {
        require_message(message)?;
        let body = ChatRequest {
            message: message.to_string(),
            history: Some(history.to_vec()),
            system_prompt: self.system_prompt.clone(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| GatewayError::Transport(e.to_string()))?;
        parse_chat_reply(status, &text)
    }
}

/// Interpret an `/api/chat` response.
fn parse_chat_reply(status: u16, body: &str) -> Result<String, GatewayError> {
    match status {
        200 => {
            let reply: ChatReply =
                serde_json::from_str(body).map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
            if !reply.success || reply.response.is_empty() {
                return Err(GatewayError::MalformedResponse("reply has no response text".into()));
            }
            Ok(reply.response)
        }
        400 => {
            let message = serde_json::from_str::<ErrorBody>(body).map_or_else(|_| truncate(body), |b| b.error);
            Err(GatewayError::InvalidInput(message))
        }
        _ => {
            let message = serde_json::from_str::<ChatFailure>(body).map_or_else(|_| truncate(body), |f| f.details);
            Err(GatewayError::Upstream { status, message })
        }
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;

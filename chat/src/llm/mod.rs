//! LLM: hosted generative-language adapter.
//!
//! DESIGN
//! ======
//! `LlmClient` pairs a [`gemini::GeminiClient`] with the model it talks to and
//! implements [`LlmChat`], which is what the server route and the direct
//! gateway depend on. Configuration comes from an explicit [`LlmConfig`]
//! built once per process.

pub mod config;
pub mod gemini;
pub mod types;

pub use config::{LlmConfig, Sampling};
pub use types::{ChatResponse, LlmChat, LlmError};

use crate::message::Turn;

pub struct LlmClient {
    inner: gemini::GeminiClient,
    model: String,
}

impl LlmClient {
    /// Build the server-profile client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(&config)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self { inner: gemini::GeminiClient::new(config)?, model: config.model.clone() })
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system: Option<&str>, history: &[Turn], message: &str) -> Result<ChatResponse, LlmError> {
        self.inner.generate(&self.model, system, history, message).await
    }
}

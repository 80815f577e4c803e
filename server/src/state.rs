//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It is
//! built once at startup and never mutated: the chat route is a stateless
//! pass-through, so there is no conversation history here, only the LLM
//! client and the default system instruction.

use std::sync::Arc;

use chat::llm::LlmChat;
use chat::llm::config::DEFAULT_SERVER_MODEL;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Optional LLM client. `None` if the API key is not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    /// System instruction used when a request does not carry its own.
    pub system_prompt: Option<Arc<str>>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>, system_prompt: Option<String>) -> Self {
        Self { llm, system_prompt: system_prompt.map(Arc::from) }
    }

    /// Model name reported by the liveness probe.
    #[must_use]
    pub fn model(&self) -> &str {
        self.llm.as_ref().map_or(DEFAULT_SERVER_MODEL, |llm| llm.model())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Mutex;

    use chat::Turn;
    use chat::llm::{ChatResponse, LlmError};

    use super::*;

    /// Create a test `AppState` with no LLM configured.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(None, None)
    }

    /// Create a test `AppState` with a mock LLM.
    #[must_use]
    pub fn test_app_state_with_llm(llm: Arc<dyn LlmChat>) -> AppState {
        AppState::new(Some(llm), None)
    }

    /// One recorded `chat` call: system instruction, history, message.
    pub type RecordedCall = (Option<String>, Vec<Turn>, String);

    /// Mock LLM answering with a fixed result and recording its inputs.
    pub struct MockLlm {
        reply: Result<String, (u16, String)>,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockLlm {
        #[must_use]
        pub fn replying(text: &str) -> Self {
            Self { reply: Ok(text.into()), calls: Mutex::new(Vec::new()) }
        }

        /// Fail every call with an upstream HTTP status.
        #[must_use]
        pub fn failing(status: u16, body: &str) -> Self {
            Self { reply: Err((status, body.into())), calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait::async_trait]
    impl LlmChat for MockLlm {
        fn model(&self) -> &str {
            "gemini-mock"
        }

        async fn chat(
            &self,
            system: Option<&str>,
            history: &[Turn],
            message: &str,
        ) -> Result<ChatResponse, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((system.map(str::to_string), history.to_vec(), message.to_string()));
            match &self.reply {
                Ok(text) => Ok(ChatResponse {
                    text: text.clone(),
                    model: "gemini-mock".into(),
                    finish_reason: Some("STOP".into()),
                    input_tokens: 3,
                    output_tokens: 5,
                }),
                Err((status, body)) => Err(LlmError::ApiResponse { status: *status, body: body.clone() }),
            }
        }
    }
}

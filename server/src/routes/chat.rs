//! Chat pass-through routes.
//!
//! DESIGN
//! ======
//! `POST /api/chat` forwards one message (plus optional prior turns) to the
//! LLM and returns the reply with markdown stripped. The body is parsed by
//! hand rather than through the `Json` extractor so that every malformed
//! input gets the same `400 { error }` shape.
//!
//! ERROR HANDLING
//! ==============
//! Upstream failures never propagate as handler errors: they become a `500`
//! with `success: false`, a fixed summary, and the underlying reason in
//! `details`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::Value;
use tracing::{info, warn};

use chat::api::{
    ChatFailure, ChatReply, ChatStatus, ErrorBody, GENERATION_FAILED, HISTORY_INVALID, MESSAGE_REQUIRED,
    STATUS_RUNNING,
};
use chat::markdown::strip_markdown;
use chat::{ErrorCode, Role, Turn};

use crate::state::AppState;

/// Validated `POST /api/chat` body.
#[derive(Debug)]
pub(crate) struct ChatInput {
    pub(crate) message: String,
    pub(crate) history: Vec<Turn>,
    pub(crate) system_prompt: Option<String>,
}

/// Validate a raw request body.
///
/// `history` that is present but not an array is ignored; an array with a
/// malformed entry is rejected.
pub(crate) fn parse_chat_input(body: &[u8]) -> Result<ChatInput, &'static str> {
    let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(body) else {
        return Err(MESSAGE_REQUIRED);
    };

    let message = match fields.remove("message") {
        Some(Value::String(message)) if !message.is_empty() => message,
        _ => return Err(MESSAGE_REQUIRED),
    };

    let history = match fields.remove("history") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(serde_json::from_value::<Turn>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| HISTORY_INVALID)?,
        _ => Vec::new(),
    };

    let system_prompt = match fields.remove("systemPrompt") {
        Some(Value::String(prompt)) if !prompt.trim().is_empty() => Some(prompt),
        _ => None,
    };

    Ok(ChatInput { message, history, system_prompt })
}

/// Markdown-stripped reply, or the raw text when stripping leaves nothing.
/// `None` if the model said nothing at all.
fn reply_text(raw: &str) -> Option<String> {
    let stripped = strip_markdown(raw);
    if !stripped.trim().is_empty() {
        return Some(stripped);
    }
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

fn failure(details: String, code: Option<&str>) -> Response {
    let body = ChatFailure {
        success: false,
        error: GENERATION_FAILED.to_string(),
        details,
        code: code.map(str::to_string),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// `POST /api/chat`: generate one reply.
pub async fn send(State(state): State<AppState>, body: Bytes) -> Response {
    let input = match parse_chat_input(&body) {
        Ok(input) => input,
        Err(error) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody { error: error.to_string() })).into_response();
        }
    };

    let Some(llm) = state.llm.as_ref() else {
        warn!("chat request received but LLM is not configured");
        return failure("LLM not configured".to_string(), Some("E_LLM_NOT_CONFIGURED"));
    };

    let system = input.system_prompt.as_deref().or(state.system_prompt.as_deref());
    match llm.chat(system, &input.history, &input.message).await {
        Ok(response) => {
            info!(
                model = %response.model,
                history_turns = input.history.len(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                "chat reply generated"
            );
            let Some(text) = reply_text(&response.text) else {
                warn!(model = %response.model, "model returned an empty reply");
                return failure("model returned an empty reply".to_string(), Some("E_EMPTY_REPLY"));
            };
            Json(ChatReply { success: true, response: text, role: Role::Model }).into_response()
        }
        Err(e) => {
            warn!(error = %e, code = e.error_code(), retryable = e.retryable(), "Gemini API error");
            failure(e.to_string(), Some(e.error_code()))
        }
    }
}

/// `GET /api/chat`: liveness probe.
pub async fn status(State(state): State<AppState>) -> Json<ChatStatus> {
    Json(ChatStatus { status: STATUS_RUNNING.to_string(), model: state.model().to_string() })
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

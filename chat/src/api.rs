//! Wire shapes of the `/api/chat` endpoint, shared by server and client.

use serde::{Deserialize, Serialize};

use crate::message::{Role, Turn};

/// Validation message for a missing, non-string, or empty `message`.
pub const MESSAGE_REQUIRED: &str = "Message is required and must be a string";

/// Validation message for a malformed `history` entry.
pub const HISTORY_INVALID: &str = "History entries must have role \"user\" or \"model\" and string content";

/// Summary error of every upstream failure.
pub const GENERATION_FAILED: &str = "Failed to generate response";

/// Liveness text of `GET /api/chat`.
pub const STATUS_RUNNING: &str = "Gemini chatbot API is running";

/// `POST /api/chat` body as sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Turn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// `200` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub success: bool,
    pub response: String,
    pub role: Role,
}

/// `500` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFailure {
    pub success: bool,
    pub error: String,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// `400` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `GET /api/chat` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStatus {
    pub status: String,
    pub model: String,
}

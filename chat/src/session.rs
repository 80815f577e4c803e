//! Session: a persisted conversation thread.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::message::{Message, Role, Turn};

/// Opening line of every new session.
pub const GREETING: &str = "Hey, how are you feeling today?";

// =============================================================================
// SESSION ID
// =============================================================================

/// Opaque session identifier. New ids are the creation time in Unix millis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn from_millis(millis: i128) -> Self {
        Self(millis.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The millisecond timestamp this id encodes, if it was time-derived.
    #[must_use]
    pub fn millis(&self) -> Option<i128> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub messages: Vec<Message>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl Session {
    /// Build a fresh session holding only the greeting, stamped at `now`.
    ///
    /// `now` is truncated to whole milliseconds so the id and `created`
    /// describe the same instant.
    #[must_use]
    pub fn greeting_at(now: OffsetDateTime) -> Self {
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        Self::greeting_with_id(SessionId::from_millis(millis), truncate_to_millis(now))
    }

    #[must_use]
    pub fn greeting_with_id(id: SessionId, created: OffsetDateTime) -> Self {
        Self { id, messages: vec![Message::model(GREETING)], created }
    }

    /// Prior turns in the shape the upstream accepts.
    ///
    /// The upstream requires the first turn to come from the user, so leading
    /// model messages (the greeting) are dropped.
    #[must_use]
    pub fn turns(&self) -> Vec<Turn> {
        self.messages
            .iter()
            .skip_while(|m| m.role == Role::Model)
            .map(Turn::from)
            .collect()
    }
}

pub(crate) fn truncate_to_millis(at: OffsetDateTime) -> OffsetDateTime {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).unwrap_or(at)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

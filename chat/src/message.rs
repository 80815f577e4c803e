//! Conversation primitives: roles, stored messages, and upstream turns.

use serde::{Deserialize, Serialize};

// =============================================================================
// ROLE
// =============================================================================

/// Author of a message.
///
/// Serialized as `"user"` / `"model"` on the HTTP boundary. Stored messages
/// use the small integer tag from [`Role::tag`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Integer tag used by the persisted session collection.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Model => 1,
        }
    }

    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::User),
            1 => Some(Self::Model),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "model" => Some(Self::Model),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod role_tag {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Role;

    pub fn serialize<S: Serializer>(role: &Role, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(role.tag())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
        let tag = u8::deserialize(deserializer)?;
        Role::from_tag(tag).ok_or_else(|| D::Error::custom(format!("unknown message role tag: {tag}")))
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// A single stored turn in a session. Immutable once created.
///
/// Wire shape is `{"id": <role tag>, "text": "..."}`; the chat feed's older
/// `message` field name is accepted when loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "id", with = "role_tag")]
    pub role: Role,
    #[serde(alias = "message")]
    pub text: String,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

// =============================================================================
// TURN
// =============================================================================

/// One prior conversational turn re-supplied to the gateway on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for Turn {
    fn from(message: &Message) -> Self {
        Self { role: message.role, content: message.text.clone() }
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

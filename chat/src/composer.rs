//! Composer: turns user input into a persisted exchange.
//!
//! DESIGN
//! ======
//! A send is split into [`Composer::submit`] (validate, append the user's
//! message, persist, hand back a [`PendingRequest`]) and
//! [`Composer::resolve`] (append the reply or the apology, persist). The
//! network call happens in between, outside the composer, so a caller can
//! keep rendering while it waits.
//!
//! Each session is either `Idle` or `Awaiting`. Single-flight is per session:
//! while one session awaits a reply, another may submit.
//!
//! Every pending request carries a token. At resolution the reply is applied
//! only if that token is still the session's outstanding one and the session
//! is still selected; otherwise it is discarded instead of landing in
//! whichever session happens to be current.

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::gateway::{APOLOGY, ChatGateway, GatewayError};
use crate::message::{Message, Turn};
use crate::session::SessionId;
use crate::store::{SessionStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    Idle,
    Awaiting,
}

/// Identifies one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(Uuid);

impl RequestToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A submitted message waiting for the gateway.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub session_id: SessionId,
    /// Trimmed user text, already stored in the session.
    pub message: String,
    /// Turns before `message`.
    pub history: Vec<Turn>,
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("message is empty")]
    EmptyInput,

    #[error("a reply is already pending for session {0}")]
    RequestOutstanding(SessionId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The token is no longer the session's outstanding request.
    Stale,
    /// The user moved to another session before the reply arrived.
    SessionSwitched,
}

/// What happened to a pending request.
#[derive(Debug)]
pub enum Resolution {
    Replied { session_id: SessionId, text: String },
    /// The gateway failed; [`APOLOGY`] was appended in place of a reply.
    Apologized { session_id: SessionId, error: GatewayError },
    Discarded { session_id: SessionId, reason: DiscardReason },
}

#[derive(Debug, Default)]
pub struct Composer {
    outstanding: HashMap<SessionId, RequestToken>,
}

impl Composer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self, session_id: &SessionId) -> ComposerState {
        if self.outstanding.contains_key(session_id) { ComposerState::Awaiting } else { ComposerState::Idle }
    }

    /// Accept input for the selected session.
    ///
    /// On success the user's message is stored and the session is
    /// `Awaiting`. Rejections leave the store and the composer untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::EmptyInput`] for whitespace-only input,
    /// [`ComposeError::RequestOutstanding`] while the session awaits a reply,
    /// or [`ComposeError::Store`] if the user's message cannot be persisted.
    pub fn submit(&mut self, store: &mut SessionStore, input: &str) -> Result<PendingRequest, ComposeError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ComposeError::EmptyInput);
        }

        let session_id = store.selected_id().clone();
        if self.outstanding.contains_key(&session_id) {
            return Err(ComposeError::RequestOutstanding(session_id));
        }

        let history = store.history(&session_id)?;
        store.append(&session_id, Message::user(text))?;

        let token = RequestToken::new();
        self.outstanding.insert(session_id.clone(), token);
        Ok(PendingRequest { token, session_id, message: text.to_string(), history })
    }

    /// Apply the gateway outcome of a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the reply cannot be persisted; the reply is
    /// then not kept in memory either. The session is back to `Idle` either way.
    pub fn resolve(
        &mut self,
        store: &mut SessionStore,
        pending: PendingRequest,
        outcome: Result<String, GatewayError>,
    ) -> Result<Resolution, StoreError> {
        let PendingRequest { token, session_id, .. } = pending;

        if self.outstanding.get(&session_id) != Some(&token) {
            warn!(%session_id, "stale reply discarded");
            return Ok(Resolution::Discarded { session_id, reason: DiscardReason::Stale });
        }
        self.outstanding.remove(&session_id);

        if store.selected_id() != &session_id {
            info!(%session_id, "reply arrived after session switch; discarded");
            return Ok(Resolution::Discarded { session_id, reason: DiscardReason::SessionSwitched });
        }

        match outcome {
            Ok(text) => {
                store.append(&session_id, Message::model(text.clone()))?;
                Ok(Resolution::Replied { session_id, text })
            }
            Err(error) => {
                warn!(%session_id, error = %error, code = error.error_code(), "gateway failed; apologizing");
                store.append(&session_id, Message::model(APOLOGY))?;
                Ok(Resolution::Apologized { session_id, error })
            }
        }
    }

    /// Submit, call the gateway, and resolve in one step.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError`] if the submission is rejected or a write fails.
    pub async fn send(
        &mut self,
        store: &mut SessionStore,
        gateway: &dyn ChatGateway,
        input: &str,
    ) -> Result<Resolution, ComposeError> {
        let pending = self.submit(store, input)?;
        let outcome = gateway.send(&pending.message, &pending.history).await;
        Ok(self.resolve(store, pending, outcome)?)
    }
}

#[cfg(test)]
#[path = "composer_test.rs"]
mod tests;

//! Session store: the ordered, persisted collection of chat sessions.
//!
//! DESIGN
//! ======
//! The whole collection is serialized as one JSON array under a single key
//! and rewritten on every mutation. There are no incremental updates and no
//! conflict resolution: the in-memory copy is the source of truth for this
//! process and the last writer wins on disk.
//!
//! INVARIANTS
//! ==========
//! - After [`SessionStore::open`] the collection is never empty and exactly
//!   one session is selected.
//! - Sessions are never removed; new ones are prepended.
//! - Session ids are unique within the collection. Duplicates in stored
//!   data are reassigned on open.
//!
//! ERROR HANDLING
//! ==============
//! A missing key or an unparseable value loads as "no sessions yet" and is
//! replaced by a fresh default session. Write failures are returned.

use std::collections::HashSet;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::message::{Message, Turn};
use crate::session::{Session, SessionId};
use crate::storage::{KeyValueStorage, StorageError};

pub const DEFAULT_SESSIONS_KEY: &str = "chat_sessions";
pub const DEFAULT_CREDENTIAL_KEY: &str = "gemini_api_key";

// =============================================================================
// CONFIG / ERROR
// =============================================================================

/// Storage keys for the persisted client state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub sessions_key: String,
    pub credential_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { sessions_key: DEFAULT_SESSIONS_KEY.to_owned(), credential_key: DEFAULT_CREDENTIAL_KEY.to_owned() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("session encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
}

// =============================================================================
// LOAD / SAVE
// =============================================================================

/// Read the full collection. Fails soft: missing or corrupt data is empty.
pub fn load_sessions(storage: &dyn KeyValueStorage, key: &str) -> Vec<Session> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, key, "session storage read failed; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(error = %e, key, "stored sessions unreadable; starting empty");
            Vec::new()
        }
    }
}

/// Overwrite the full collection.
///
/// # Errors
///
/// Returns [`StoreError`] if encoding or the storage write fails.
pub fn save_sessions(storage: &dyn KeyValueStorage, key: &str, sessions: &[Session]) -> Result<(), StoreError> {
    let json = serde_json::to_string(sessions)?;
    storage.set(key, &json)?;
    debug!(key, count = sessions.len(), "sessions saved");
    Ok(())
}

/// Give every session after the first holder of an id a fresh one.
///
/// Time-derived ids are bumped forward a millisecond at a time; other ids
/// get a numeric suffix. Returns how many sessions were renamed.
fn dedupe_ids(sessions: &mut [Session]) -> usize {
    let mut seen: HashSet<SessionId> = sessions.iter().map(|s| s.id.clone()).collect();
    if seen.len() == sessions.len() {
        return 0;
    }

    let mut first_seen = HashSet::new();
    let mut renamed = 0;
    for session in sessions.iter_mut() {
        if first_seen.insert(session.id.clone()) {
            continue;
        }
        let fresh = match session.id.millis() {
            Some(millis) => (1..)
                .map(|n| SessionId::from_millis(millis + n))
                .find(|id| !seen.contains(id)),
            None => (2..)
                .map(|n| SessionId::from(format!("{}-{n}", session.id)))
                .find(|id| !seen.contains(id)),
        };
        if let Some(fresh) = fresh {
            warn!(duplicate = %session.id, session_id = %fresh, "duplicate session id reassigned");
            seen.insert(fresh.clone());
            first_seen.insert(fresh.clone());
            session.id = fresh;
            renamed += 1;
        }
    }
    renamed
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    sessions: Vec<Session>,
    /// Index into `sessions`. Always in bounds once opened.
    selected: usize,
}

impl SessionStore {
    /// Load the collection, creating the default session if it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the default session cannot be persisted.
    pub fn open(storage: Arc<dyn KeyValueStorage>, config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open_at(storage, config, OffsetDateTime::now_utc())
    }

    /// [`SessionStore::open`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the default session cannot be persisted.
    pub fn open_at(
        storage: Arc<dyn KeyValueStorage>,
        config: &StoreConfig,
        now: OffsetDateTime,
    ) -> Result<Self, StoreError> {
        let key = config.sessions_key.clone();
        let mut sessions = load_sessions(storage.as_ref(), &key);
        if dedupe_ids(&mut sessions) > 0 {
            save_sessions(storage.as_ref(), &key, &sessions)?;
        }
        if sessions.is_empty() {
            let session = Session::greeting_at(now);
            info!(session_id = %session.id, "no stored sessions; created default session");
            sessions.push(session);
            save_sessions(storage.as_ref(), &key, &sessions)?;
        }
        Ok(Self { storage, key, sessions, selected: 0 })
    }

    /// Re-read the persisted collection without touching in-memory state.
    #[must_use]
    pub fn load(&self) -> Vec<Session> {
        load_sessions(self.storage.as_ref(), &self.key)
    }

    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    #[must_use]
    pub fn selected(&self) -> &Session {
        &self.sessions[self.selected]
    }

    #[must_use]
    pub fn selected_id(&self) -> &SessionId {
        &self.selected().id
    }

    /// Switch the selected session. Unknown ids leave the selection alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownSession`] if no session has `id`.
    pub fn select(&mut self, id: &SessionId) -> Result<(), StoreError> {
        let index = self.position(id)?;
        self.selected = index;
        Ok(())
    }

    /// Create a greeting session, prepend it, persist, and select it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the collection cannot be persisted.
    pub fn create_session(&mut self) -> Result<&Session, StoreError> {
        self.create_session_at(OffsetDateTime::now_utc())
    }

    /// [`SessionStore::create_session`] with an explicit clock reading.
    ///
    /// Two sessions created within the same millisecond would share an id,
    /// so the candidate id is bumped forward until it is unused.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the collection cannot be persisted.
    pub fn create_session_at(&mut self, now: OffsetDateTime) -> Result<&Session, StoreError> {
        let mut session = Session::greeting_at(now);
        if let Some(mut millis) = session.id.millis() {
            while self.get(&session.id).is_some() {
                millis += 1;
                session.id = SessionId::from_millis(millis);
            }
        }

        self.sessions.insert(0, session);
        if let Err(e) = self.persist() {
            self.sessions.remove(0);
            return Err(e);
        }
        self.selected = 0;
        info!(session_id = %self.sessions[0].id, "session created");
        Ok(&self.sessions[0])
    }

    /// Append a message to a session and persist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownSession`] for an unknown id, or a storage
    /// error if the write fails. A failed write leaves the session unchanged.
    pub fn append(&mut self, id: &SessionId, message: Message) -> Result<(), StoreError> {
        let index = self.position(id)?;
        self.sessions[index].messages.push(message);
        if let Err(e) = self.persist() {
            self.sessions[index].messages.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Prior turns of a session, ready to hand to a gateway.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownSession`] for an unknown id.
    pub fn history(&self, id: &SessionId) -> Result<Vec<Turn>, StoreError> {
        self.get(id)
            .map(Session::turns)
            .ok_or_else(|| StoreError::UnknownSession(id.clone()))
    }

    /// Write the in-memory collection to storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if encoding or the write fails.
    pub fn persist(&self) -> Result<(), StoreError> {
        save_sessions(self.storage.as_ref(), &self.key, &self.sessions)
    }

    fn position(&self, id: &SessionId) -> Result<usize, StoreError> {
        self.sessions
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| StoreError::UnknownSession(id.clone()))
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

//! Locally stored upstream API key for the direct-call gateway.

use std::sync::Arc;

use crate::storage::{KeyValueStorage, StorageError};
use crate::store::StoreConfig;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("API key must not be blank")]
    Blank,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct CredentialStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl CredentialStore {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>, config: &StoreConfig) -> Self {
        Self { storage, key: config.credential_key.clone() }
    }

    /// The stored key, if any. Blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the storage read fails.
    pub fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get(&self.key)?
            .map(|raw| raw.trim().to_owned())
            .filter(|key| !key.is_empty()))
    }

    /// Trim and store a key, returning what was stored.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Blank`] for an empty key, or a storage error.
    pub fn save(&self, raw: &str) -> Result<String, CredentialError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(CredentialError::Blank);
        }
        self.storage.set(&self.key, key)?;
        Ok(key.to_owned())
    }

    /// Forget the stored key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the storage write fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStorage::new()), &StoreConfig::default())
    }

    #[test]
    fn load_without_key_is_none() {
        assert_eq!(store().load().unwrap(), None);
    }

    #[test]
    fn save_trims_and_loads() {
        let creds = store();
        assert_eq!(creds.save("  AIza-test \n").unwrap(), "AIza-test");
        assert_eq!(creds.load().unwrap().as_deref(), Some("AIza-test"));
    }

    #[test]
    fn save_blank_is_rejected() {
        let creds = store();
        assert!(matches!(creds.save("   "), Err(CredentialError::Blank)));
        assert_eq!(creds.load().unwrap(), None);
    }

    #[test]
    fn clear_removes_key() {
        let creds = store();
        creds.save("k").unwrap();
        creds.clear().unwrap();
        assert_eq!(creds.load().unwrap(), None);
    }

    #[test]
    fn blank_stored_value_counts_as_absent() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        storage.set("gemini_api_key", "  ").unwrap();
        let creds = CredentialStore::new(storage, &StoreConfig::default());
        assert_eq!(creds.load().unwrap(), None);
    }
}

//! Durable session persistence.
//!
//! The credential and identity are stored as a single record so they can
//! only ever be set and cleared together — partial session state is
//! unrepresentable. [`CredentialStore::load`] distinguishes an absent
//! record from a malformed one; the session store downgrades the latter
//! to an anonymous session instead of failing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use taskdeck_proto::user::UserIdentity;

/// Errors from the credential store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A record exists but could not be parsed.
    #[error("malformed persisted session: {0}")]
    Malformed(String),

    /// Reading or writing the backing storage failed.
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The single persisted record: credential and identity together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Opaque bearer token.
    pub token: String,
    /// The identity the token belongs to.
    pub user: UserIdentity,
}

/// Stores the session record across process restarts.
pub trait CredentialStore {
    /// Loads the persisted record; `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Malformed`] when a record exists but cannot
    /// be parsed, or [`StorageError::Io`] when reading fails.
    fn load(&self) -> Result<Option<PersistedSession>, StorageError>;

    /// Persists the record, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing storage cannot be written.
    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;

    /// Removes the persisted record. Clearing an absent record succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when removal fails for any reason
    /// other than the record being absent.
    fn clear(&self) -> Result<(), StorageError>;
}

/// File-backed credential store (one JSON file in the platform data dir).
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store over the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data dir>/taskdeck/session.json`.
    ///
    /// Returns `None` when the platform data directory cannot be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::data_dir()?.join("taskdeck").join("session.json"))
    }

    /// The file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        let session =
            serde_json::from_str(&contents).map_err(|e| StorageError::Malformed(e.to_string()))?;
        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// In-memory credential store for tests.
///
/// Clones share the same record, so a "restarted" session store can be
/// pointed at the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    record: std::sync::Arc<parking_lot::Mutex<Option<PersistedSession>>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        *self.record.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.record.lock() = None;
        Ok(())
    }
}

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Token file name in the cache directory
const TOKEN_FILE: &str = "token.json";

/// Keychain service and account names for the bearer token
const SERVICE_NAME: &str = "elibrary";
const KEYRING_USER: &str = "bearer-token";

/// Opaque bearer token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Durable home of the bearer token. Absence means logged out.
///
/// Only the session store writes through this trait.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, StorageError>;
    fn save(&self, token: &Credential) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

// ============================================================================
// File-backed store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Stores the token as JSON in the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn token_path(&self) -> PathBuf {
        self.cache_dir.join(TOKEN_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<TokenFile>(&contents) {
            Ok(file) if !file.token.trim().is_empty() => {
                debug!(saved_at = %file.saved_at, "Loaded stored token");
                Ok(Some(Credential(file.token)))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                // A corrupt file is the same as no token; drop it so the next load is clean
                warn!(error = %e, path = %path.display(), "Discarding unreadable token file");
                std::fs::remove_file(&path)?;
                Ok(None)
            }
        }
    }

    fn save(&self, token: &Credential) -> Result<(), StorageError> {
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = TokenFile {
            token: token.0.clone(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// OS keychain store
// ============================================================================

/// Stores the token in the OS keychain.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::for_account(KEYRING_USER)
    }

    /// Store under a different keychain account of the same service
    pub fn for_account(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Ok(Entry::new(SERVICE_NAME, &self.account)?)
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(Credential(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &Credential) -> Result<(), StorageError> {
        self.entry()?.set_password(&token.0)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<Credential>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Credential::new(token)))),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        Ok(self.slot().clone())
    }

    fn save(&self, token: &Credential) -> Result<(), StorageError> {
        *self.slot() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_credential_debug_is_redacted() {
        let token = Credential::new("tok-123");
        assert_eq!(format!("{:?}", token), "Credential(***)");
        assert_eq!(token.expose(), "tok-123");
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path().join("nested"));

        assert!(store.load().unwrap().is_none());
        store.save(&Credential::new("tok-123")).unwrap();
        assert_eq!(store.load().unwrap(), Some(Credential::new("tok-123")));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_discards_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path().to_path_buf());
        std::fs::write(tmp.path().join(TOKEN_FILE), "not json").unwrap();

        assert!(store.load().unwrap().is_none());
        assert!(!tmp.path().join(TOKEN_FILE).exists());
    }

    #[test]
    fn test_keyring_store_roundtrip() {
        let store = KeyringTokenStore::for_account(format!("test-{}", std::process::id()));
        // Sandboxes without a keychain reject the write; nothing to check there
        if let Err(e) = store.save(&Credential::new("tok-123")) {
            eprintln!("keychain unavailable, skipping: {}", e);
            return;
        }

        let loaded = store.load();
        let _ = store.clear();
        assert_eq!(loaded.unwrap(), Some(Credential::new("tok-123")));

        // Gone after clear, and clearing again is fine
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let store = MemoryTokenStore::new();
        let view = store.clone();
        store.save(&Credential::new("abc")).unwrap();
        assert_eq!(view.load().unwrap(), Some(Credential::new("abc")));
        view.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}

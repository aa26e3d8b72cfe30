use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Keychain service name for the keyring backend
const SERVICE_NAME: &str = "bankfront";

/// Keychain account holding the serialized session map
const KEYRING_ACCOUNT: &str = "session";

/// Durable storage for session-scoped keys.
///
/// Backends see the whole session as one map: `persist` replaces everything
/// stored, `wipe` removes it. Wiping storage that holds nothing is not an error.
pub trait SessionBackend: Send + Sync {
    fn load(&self) -> Result<HashMap<String, String>>;
    fn persist(&self, values: &HashMap<String, String>) -> Result<()>;
    fn wipe(&self) -> Result<()>;
}

impl<T: SessionBackend + ?Sized> SessionBackend for Arc<T> {
    fn load(&self) -> Result<HashMap<String, String>> {
        (**self).load()
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        (**self).persist(values)
    }

    fn wipe(&self) -> Result<()> {
        (**self).wipe()
    }
}

/// Volatile backend; nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with values, as if a previous run had persisted them
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.lock().clone())
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        *self.lock() = values.clone();
        Ok(())
    }

    fn wipe(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}

/// JSON file in the cache directory. Survives restarts of the front-end.
pub struct FileBackend {
    cache_dir: PathBuf,
}

impl FileBackend {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Result<HashMap<String, String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;
        let values = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        debug!(path = %path.display(), "Loaded persisted session");
        Ok(values)
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(values)?;
        std::fs::write(&path, contents)
            .context("Failed to write session file")?;
        Ok(())
    }

    fn wipe(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path)
                .context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// OS keychain entry holding the whole session map as JSON.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, KEYRING_ACCOUNT)
            .context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for KeyringBackend {
    fn load(&self) -> Result<HashMap<String, String>> {
        match self.entry()?.get_password() {
            Ok(contents) => serde_json::from_str(&contents)
                .context("Failed to parse session stored in keychain"),
            Err(keyring::Error::NoEntry) => Ok(HashMap::new()),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string(values)?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store session in keychain")
    }

    fn wipe(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> HashMap<String, String> {
        HashMap::from([
            ("access_token".to_string(), "tok-abc".to_string()),
            ("email_id".to_string(), "ann@example.com".to_string()),
        ])
    }

    #[test]
    fn test_file_backend_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_backend_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        FileBackend::new(dir.path().join("nested")).persist(&sample()).unwrap();

        let reopened = FileBackend::new(dir.path().join("nested"));
        assert_eq!(reopened.load().unwrap(), sample());
    }

    #[test]
    fn test_file_backend_wipe_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());
        backend.persist(&sample()).unwrap();

        backend.wipe().unwrap();
        assert!(!dir.path().join(SESSION_FILE).exists());
        backend.wipe().unwrap();
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_backend_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "{not json").unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());
        assert!(backend.load().is_err());
    }

    #[test]
    fn test_memory_backend_with_values() {
        let backend = MemoryBackend::with_values(sample());
        assert_eq!(backend.load().unwrap(), sample());
        backend.wipe().unwrap();
        assert!(backend.load().unwrap().is_empty());
    }
}

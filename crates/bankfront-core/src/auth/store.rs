use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{Credential, MemoryBackend, SessionBackend};

/// Key holding the raw access token
const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the email address the session was opened with
pub const EMAIL_KEY: &str = "email_id";

/// Key holding the signed-in user's id, once known
pub const USER_ID_KEY: &str = "user_id";

/// Key holding the RFC 3339 time the credential was stored
const SIGNED_IN_AT_KEY: &str = "signed_in_at";

/// Session context shared by the API client and the views.
///
/// Reads are served from memory and never fail. Writes go through to the
/// backend; if persisting fails the in-memory state still reflects the write
/// and the error is returned to the caller. The in-memory lock is released
/// before the backend is touched.
pub struct SessionStore {
    backend: Box<dyn SessionBackend>,
    values: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    /// Open the store, loading whatever the backend persisted.
    /// An unreadable backend is a fatal startup error.
    pub fn open(backend: impl SessionBackend + 'static) -> Result<Self> {
        let values = backend
            .load()
            .context("Session storage is unavailable")?;
        debug!(keys = values.len(), "Session store opened");
        Ok(Self {
            backend: Box::new(backend),
            values: Mutex::new(values),
        })
    }

    /// Empty store with no persistence
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            values: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current credential, if a session is active
    pub fn get(&self) -> Option<Credential> {
        self.lock().get(ACCESS_TOKEN_KEY).cloned().map(Credential::from)
    }

    /// Store a credential, replacing any previous one
    pub fn set(&self, credential: Credential) -> Result<()> {
        let snapshot = {
            let mut values = self.lock();
            values.insert(ACCESS_TOKEN_KEY.to_string(), credential.into_inner());
            values.insert(SIGNED_IN_AT_KEY.to_string(), Utc::now().to_rfc3339());
            values.clone()
        };
        info!("Session credential stored");
        self.backend.persist(&snapshot)
    }

    /// Remove the credential and every other session-scoped value
    pub fn clear(&self) -> Result<()> {
        let had_values = {
            let mut values = self.lock();
            let had_values = !values.is_empty();
            values.clear();
            had_values
        };
        if had_values {
            info!("Session cleared");
        }
        self.backend.wipe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().contains_key(ACCESS_TOKEN_KEY)
    }

    /// Read another session-scoped value
    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Write another session-scoped value; it is removed by `clear()`
    pub fn set_value(&self, key: &str, value: impl Into<String>) -> Result<()> {
        let snapshot = {
            let mut values = self.lock();
            values.insert(key.to_string(), value.into());
            values.clone()
        };
        self.backend.persist(&snapshot)
    }

    pub fn email(&self) -> Option<String> {
        self.value(EMAIL_KEY)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.value(USER_ID_KEY).and_then(|id| id.parse().ok())
    }

    /// When the current credential was stored
    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.value(SIGNED_IN_AT_KEY)
            .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

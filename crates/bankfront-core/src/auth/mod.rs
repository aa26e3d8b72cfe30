//! Authentication module for the session credential.
//!
//! This module provides:
//! - `Credential`: the opaque access token issued by the login endpoint
//! - `SessionStore`: the injected session context holding the credential
//! - `SessionBackend`: pluggable persistence (memory, JSON file, OS keychain)
//!
//! The store is empty at cold start unless the backend has a persisted session,
//! and `clear()` wipes every session-scoped key at once.

pub mod backend;
pub mod credential;
pub mod store;

pub use backend::{FileBackend, KeyringBackend, MemoryBackend, SessionBackend};
pub use credential::Credential;
pub use store::SessionStore;

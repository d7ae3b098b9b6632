//! Key-value persistence for session artifacts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Store key for the current client id.
pub const CLIENT_ID_KEY: &str = "idkit.client_id";
/// Store key for the last-active session id.
pub const SESSION_ID_KEY: &str = "idkit.session_id";

/// Opaque persistence for session artifacts.
///
/// The coordinator writes the client and session ids here on every successful
/// refresh and clears them on sign-out. What the store does with the values
/// (keychain, encrypted prefs, plain file) is the host's concern.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Prepare the backing store. Called once during bootstrap; lifecycle
    /// refreshes are gated on its completion.
    async fn initialize(&self);

    fn put(&self, key: &str, value: &str);
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&self, key: &str);
}

/// In-memory store, the default for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn initialize(&self) {}

    fn put(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("lock poisoned").get(key).cloned()
    }

    fn remove(&self, key: &str) {
        self.entries.lock().expect("lock poisoned").remove(key);
    }
}

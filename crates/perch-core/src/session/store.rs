//! Principal-to-session cache trait and in-memory implementation.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// Cache mapping a principal to its active session id.
///
/// The cache is best-effort: a stale entry is detected on use (the engine
/// reports the session missing) and invalidated, not proactively expired.
pub trait SessionStore: Send + Sync {
    /// Look up the cached session id for a principal.
    fn get(&self, principal_id: &str) -> impl std::future::Future<Output = Option<String>> + Send;

    /// Record the active session id for a principal.
    fn put(
        &self,
        principal_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Drop the cached entry for a principal.
    fn invalidate(&self, principal_id: &str) -> impl std::future::Future<Output = ()> + Send;
}

/// Process-local session cache behind a single async mutex.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    async fn get(&self, principal_id: &str) -> Option<String> {
        self.entries.lock().await.get(principal_id).cloned()
    }

    async fn put(&self, principal_id: &str, session_id: &str) {
        self.entries
            .lock()
            .await
            .insert(principal_id.to_string(), session_id.to_string());
    }

    async fn invalidate(&self, principal_id: &str) {
        self.entries.lock().await.remove(principal_id);
    }
}

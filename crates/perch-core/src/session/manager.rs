//! Session resolution against the upstream engine.

use perch_types::error::UpstreamError;
use perch_types::session::{short_session_id, Session};
use tracing::{debug, info};

use crate::session::store::SessionStore;
use crate::upstream::AgentService;

/// Resolves the active session for a principal: cache first, then resume
/// the most recently updated session upstream, then create a fresh one.
pub struct SessionManager<S, A> {
    store: S,
    agent: A,
}

impl<S: SessionStore, A: AgentService> SessionManager<S, A> {
    pub fn new(store: S, agent: A) -> Self {
        Self { store, agent }
    }

    /// Resolve the session id to use for a principal's next turn.
    pub async fn resolve(&self, principal_id: &str) -> Result<String, UpstreamError> {
        if let Some(session_id) = self.store.get(principal_id).await {
            debug!(
                principal_id,
                session_id = short_session_id(&session_id),
                "using cached session"
            );
            return Ok(session_id);
        }

        let sessions = self.agent.list_sessions(principal_id).await?;
        if let Some(session) = most_recent(&sessions) {
            info!(
                principal_id,
                session_id = session.short_id(),
                "resuming existing session"
            );
            self.store.put(principal_id, &session.id).await;
            return Ok(session.id.clone());
        }

        let session = self.agent.create_session(principal_id).await?;
        info!(
            principal_id,
            session_id = session.short_id(),
            "created new session"
        );
        self.store.put(principal_id, &session.id).await;
        Ok(session.id)
    }

    /// Drop the cached session for a principal, forcing the next resolve
    /// to consult the engine again.
    pub async fn invalidate(&self, principal_id: &str) {
        self.store.invalidate(principal_id).await;
    }

    /// Replace the cached session for a principal (used after compaction
    /// swaps in a new session).
    pub async fn replace(&self, principal_id: &str, session_id: &str) {
        self.store.put(principal_id, session_id).await;
    }
}

/// Pick the session with the greatest last update time. Sessions without a
/// timestamp lose to any session that has one.
fn most_recent(sessions: &[Session]) -> Option<&Session> {
    sessions.iter().max_by_key(|s| s.last_update_time)
}

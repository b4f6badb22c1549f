//! Agent engine trait definition.
//!
//! The upstream engine owns sessions and executes agent turns. Perch never
//! persists conversation state itself; everything here round-trips through
//! the engine's HTTP API. The concrete implementation lives in perch-infra
//! (HttpAgentService).

use perch_types::error::UpstreamError;
use perch_types::event::{AgentEvent, EventEnvelope};
use perch_types::session::Session;

/// Observer invoked for each structured event as the engine streams it.
pub type EventSink = Box<dyn FnMut(&AgentEvent) + Send>;

/// The completed result of one agent turn.
#[derive(Debug, Clone, Default)]
pub struct AgentTurn {
    /// The agent's final text reply. When the stream carries several text
    /// events, the last one wins.
    pub text: String,
    /// All structured events observed during the turn, in stream order.
    pub events: Vec<AgentEvent>,
}

/// Client trait for the upstream agent engine.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait AgentService: Send + Sync {
    /// List all sessions belonging to a principal.
    fn list_sessions(
        &self,
        principal_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, UpstreamError>> + Send;

    /// Create a fresh session for a principal.
    fn create_session(
        &self,
        principal_id: &str,
    ) -> impl std::future::Future<Output = Result<Session, UpstreamError>> + Send;

    /// Delete a session. Deleting an already-gone session is not an error.
    fn delete_session(
        &self,
        principal_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), UpstreamError>> + Send;

    /// Fetch the full event history of a session.
    fn session_events(
        &self,
        principal_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<EventEnvelope>, UpstreamError>> + Send;

    /// Run one agent turn, streaming events until the final reply.
    ///
    /// `on_event` is called for each structured event as it arrives, before
    /// the turn completes. A turn that ends abruptly still succeeds if any
    /// text was captured.
    fn run(
        &self,
        principal_id: &str,
        session_id: &str,
        text: &str,
        on_event: Option<EventSink>,
    ) -> impl std::future::Future<Output = Result<AgentTurn, UpstreamError>> + Send;

    /// Whether the engine is reachable and ready to serve.
    fn healthy(&self) -> impl std::future::Future<Output = bool> + Send;
}

impl<T: AgentService> AgentService for std::sync::Arc<T> {
    async fn list_sessions(&self, principal_id: &str) -> Result<Vec<Session>, UpstreamError> {
        (**self).list_sessions(principal_id).await
    }

    async fn create_session(&self, principal_id: &str) -> Result<Session, UpstreamError> {
        (**self).create_session(principal_id).await
    }

    async fn delete_session(
        &self,
        principal_id: &str,
        session_id: &str,
    ) -> Result<(), UpstreamError> {
        (**self).delete_session(principal_id, session_id).await
    }

    async fn session_events(
        &self,
        principal_id: &str,
        session_id: &str,
    ) -> Result<Vec<EventEnvelope>, UpstreamError> {
        (**self).session_events(principal_id, session_id).await
    }

    async fn run(
        &self,
        principal_id: &str,
        session_id: &str,
        text: &str,
        on_event: Option<EventSink>,
    ) -> Result<AgentTurn, UpstreamError> {
        (**self).run(principal_id, session_id, text, on_event).await
    }

    async fn healthy(&self) -> bool {
        (**self).healthy().await
    }
}

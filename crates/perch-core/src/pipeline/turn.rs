//! The per-message turn service.
//!
//! `TurnService` ties the pipeline together: session resolution, context
//! enrichment, the compaction check, and the agent run, with one bounded
//! retry when the engine has forgotten the session.

use std::sync::Arc;

use perch_types::error::UpstreamError;
use perch_types::event::AgentEvent;
use perch_types::session::{short_session_id, ProcessResult};
use tracing::{debug, info, warn};

use crate::memory::context::{enrich_heartbeat, TaskListSource};
use crate::memory::recall::inject_recall;
use crate::memory::MemoryStore;
use crate::pipeline::{compact, estimate_tokens, CompactionConfig};
use crate::session::{SessionManager, SessionStore};
use crate::summarize::Summarizer;
use crate::upstream::{AgentService, EventSink};

/// Marker prefix on scheduler-generated messages.
pub const HEARTBEAT_PREFIX: &str = "[HEARTBEAT]";

pub struct TurnService<A, S, SUM, M> {
    agent: Arc<A>,
    sessions: SessionManager<S, Arc<A>>,
    /// `None` when no summarizer credentials were configured; the pipeline
    /// then runs with compaction disabled.
    summarizer: Option<SUM>,
    memory: M,
    compaction: CompactionConfig,
    tasks: Option<TaskListSource>,
}

impl<A, S, SUM, M> TurnService<A, S, SUM, M>
where
    A: AgentService,
    S: SessionStore,
    SUM: Summarizer,
    M: MemoryStore,
{
    pub fn new(
        agent: Arc<A>,
        store: S,
        summarizer: Option<SUM>,
        memory: M,
        compaction: CompactionConfig,
        tasks: Option<TaskListSource>,
    ) -> Self {
        if summarizer.is_none() {
            warn!("no summarizer configured, session compaction disabled");
        }
        let sessions = SessionManager::new(store, Arc::clone(&agent));
        Self {
            agent,
            sessions,
            summarizer,
            memory,
            compaction,
            tasks,
        }
    }

    /// Handle one inbound message end to end: resolve the principal's
    /// session, run the pipeline, and retry once on a fresh session if the
    /// engine reports the resolved one missing.
    pub async fn handle(
        &self,
        principal_id: &str,
        text: &str,
    ) -> Result<ProcessResult, UpstreamError> {
        let session_id = self.sessions.resolve(principal_id).await?;
        match self.process_message(principal_id, &session_id, text).await {
            Err(err) if err.is_session_not_found() => {
                info!(
                    principal_id,
                    session_id = short_session_id(&session_id),
                    "session gone upstream, recreating once"
                );
                self.sessions.invalidate(principal_id).await;
                let session_id = self.sessions.resolve(principal_id).await?;
                self.process_message(principal_id, &session_id, text).await
            }
            other => other,
        }
    }

    /// Run the pipeline against a known session: heartbeat enrichment,
    /// associative recall, the compaction check, then the agent turn.
    pub async fn process_message(
        &self,
        principal_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<ProcessResult, UpstreamError> {
        let text = if text.starts_with(HEARTBEAT_PREFIX) {
            enrich_heartbeat(&self.memory, text, self.tasks.as_ref()).await
        } else {
            text.to_string()
        };
        let text = inject_recall(&self.memory, &text).await;

        let session_id = self
            .maybe_compact(principal_id, session_id.to_string())
            .await;

        let sink: EventSink = Box::new(|event| {
            if let AgentEvent::ToolCall { tool_name, .. } = event {
                debug!(tool = %tool_name, "tool call");
            }
        });
        let turn = self
            .agent
            .run(principal_id, &session_id, &text, Some(sink))
            .await?;

        Ok(ProcessResult {
            text: turn.text,
            session_id,
            events: turn.events,
        })
    }

    /// Estimate the session's token footprint and compact when it exceeds
    /// the threshold. Returns the session id to run against; on any failure
    /// the original id is kept.
    async fn maybe_compact(&self, principal_id: &str, session_id: String) -> String {
        let Some(summarizer) = &self.summarizer else {
            return session_id;
        };

        let tokens = match self.agent.session_events(principal_id, &session_id).await {
            Ok(events) => estimate_tokens(&events),
            Err(err) => {
                warn!(error = %err, "token estimation failed");
                return session_id;
            }
        };
        debug!(
            session_id = short_session_id(&session_id),
            tokens, "estimated session tokens"
        );
        if tokens <= self.compaction.threshold_tokens() {
            return session_id;
        }

        info!(
            session_id = short_session_id(&session_id),
            tokens,
            threshold = self.compaction.threshold_tokens(),
            "compacting session"
        );
        match compact(
            self.agent.as_ref(),
            summarizer,
            &self.memory,
            principal_id,
            &session_id,
        )
        .await
        {
            Ok(new_id) => {
                self.sessions.replace(principal_id, &new_id).await;
                new_id
            }
            Err(err) => {
                warn!(error = %err, "compaction failed, continuing with current session");
                session_id
            }
        }
    }
}

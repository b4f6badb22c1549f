//! The heartbeat scheduler loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::heartbeat::directive::{is_suppressed, parse_next_heartbeat};
use crate::memory::MemoryStore;
use crate::pipeline::{TurnService, HEARTBEAT_PREFIX};
use crate::session::SessionStore;
use crate::summarize::Summarizer;
use crate::upstream::AgentService;

/// Synthetic principal used for scheduler-generated turns.
pub const HEARTBEAT_PRINCIPAL: &str = "heartbeat";

/// How often the engine is polled before the first tick.
const READY_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between ticks. Zero disables the loop. The operator's
    /// choice is taken as-is; only agent-requested intervals are clamped.
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
        }
    }
}

/// Delivery target for non-trivial heartbeat replies.
pub trait OutboundSink: Send + Sync {
    fn deliver(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;
}

/// Run the heartbeat loop until cancelled.
///
/// Waits for the engine to report healthy, then ticks at the configured
/// interval, sending `[HEARTBEAT]` through the full pipeline. Replies may
/// reschedule the next tick; all-clear replies are suppressed. Errors never
/// stop the loop.
pub async fn run_heartbeat<A, S, SUM, M, O>(
    turns: Arc<TurnService<A, S, SUM, M>>,
    agent: Arc<A>,
    config: HeartbeatConfig,
    sink: O,
    cancel: CancellationToken,
) where
    A: AgentService,
    S: SessionStore,
    SUM: Summarizer,
    M: MemoryStore,
    O: OutboundSink,
{
    if config.interval.is_zero() {
        info!("heartbeat disabled");
        return;
    }

    loop {
        if agent.healthy().await {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(READY_POLL) => {}
        }
    }

    let mut interval = config.interval;
    info!(interval_secs = interval.as_secs(), "heartbeat started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("heartbeat stopped");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let mut response = match turns.handle(HEARTBEAT_PRINCIPAL, HEARTBEAT_PREFIX).await {
            Ok(result) => result.text,
            Err(err) => {
                warn!(error = %err, "heartbeat tick failed");
                continue;
            }
        };

        if let Some((next, stripped)) = parse_next_heartbeat(&response) {
            info!(next_secs = next.as_secs(), "heartbeat rescheduled by agent");
            interval = next;
            response = stripped;
        }

        if is_suppressed(&response) {
            continue;
        }

        match sink.deliver(&response).await {
            Ok(()) => info!(chars = response.len(), "heartbeat reply relayed"),
            Err(err) => warn!(error = %err, "heartbeat relay failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use perch_types::error::{RepositoryError, UpstreamError};
    use perch_types::event::EventEnvelope;
    use perch_types::memory::{MemoryEntry, RecalledMemory};
    use perch_types::session::Session;

    use super::*;
    use crate::pipeline::CompactionConfig;
    use crate::session::InMemorySessionStore;
    use crate::upstream::{AgentTurn, EventSink};

    /// Engine whose runs reply from a fixed script, one entry per tick.
    struct ScriptedEngine {
        replies: Vec<&'static str>,
        tick: AtomicUsize,
    }

    impl AgentService for ScriptedEngine {
        async fn list_sessions(&self, _principal_id: &str) -> Result<Vec<Session>, UpstreamError> {
            Ok(vec![])
        }

        async fn create_session(&self, _principal_id: &str) -> Result<Session, UpstreamError> {
            Ok(Session {
                id: "hb-session".to_string(),
                principal_id: HEARTBEAT_PRINCIPAL.to_string(),
                last_update_time: None,
            })
        }

        async fn delete_session(
            &self,
            _principal_id: &str,
            _session_id: &str,
        ) -> Result<(), UpstreamError> {
            Ok(())
        }

        async fn session_events(
            &self,
            _principal_id: &str,
            _session_id: &str,
        ) -> Result<Vec<EventEnvelope>, UpstreamError> {
            Ok(vec![])
        }

        async fn run(
            &self,
            _principal_id: &str,
            _session_id: &str,
            _text: &str,
            _on_event: Option<EventSink>,
        ) -> Result<AgentTurn, UpstreamError> {
            let n = self.tick.fetch_add(1, Ordering::SeqCst);
            let text = self.replies.get(n).copied().unwrap_or("HEARTBEAT_OK");
            Ok(AgentTurn {
                text: text.to_string(),
                events: vec![],
            })
        }

        async fn healthy(&self) -> bool {
            true
        }
    }

    struct NullMemory;

    impl MemoryStore for NullMemory {
        async fn save(&self, _entry: &MemoryEntry) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn latest_continuation(&self) -> Result<Option<MemoryEntry>, RepositoryError> {
            Ok(None)
        }

        async fn top_memories(&self, _limit: i64) -> Result<Vec<MemoryEntry>, RepositoryError> {
            Ok(vec![])
        }

        async fn search(
            &self,
            _keywords: &[String],
            _limit: i64,
        ) -> Result<Vec<RecalledMemory>, RepositoryError> {
            Ok(vec![])
        }
    }

    struct NeverSummarizer;

    impl Summarizer for NeverSummarizer {
        async fn summarize(&self, _prompt: &str) -> Result<String, String> {
            Err("unused".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Arc<Mutex<Vec<String>>>,
    }

    impl OutboundSink for RecordingSink {
        async fn deliver(&self, text: &str) -> Result<(), String> {
            self.delivered.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn turns(
        engine: Arc<ScriptedEngine>,
    ) -> Arc<TurnService<ScriptedEngine, InMemorySessionStore, NeverSummarizer, NullMemory>> {
        Arc::new(TurnService::new(
            engine,
            InMemorySessionStore::new(),
            None,
            NullMemory,
            CompactionConfig::default(),
            None,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_replies_are_not_relayed() {
        let engine = Arc::new(ScriptedEngine {
            replies: vec!["HEARTBEAT_OK", "All idle. HEARTBEAT_OK", "found a stuck deploy"],
            tick: AtomicUsize::new(0),
        });
        let sink = RecordingSink::default();
        let delivered = Arc::clone(&sink.delivered);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_heartbeat(
            turns(Arc::clone(&engine)),
            engine,
            HeartbeatConfig {
                interval: Duration::from_secs(60),
            },
            sink,
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(
            delivered.lock().unwrap().clone(),
            vec!["found a stuck deploy".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_directive_reschedules_and_is_stripped() {
        let engine = Arc::new(ScriptedEngine {
            replies: vec!["Back soon.\nNEXT_HEARTBEAT: 45s", "second tick report"],
            tick: AtomicUsize::new(0),
        });
        let sink = RecordingSink::default();
        let delivered = Arc::clone(&sink.delivered);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_heartbeat(
            turns(Arc::clone(&engine)),
            Arc::clone(&engine),
            HeartbeatConfig {
                interval: Duration::from_secs(600),
            },
            sink,
            cancel.clone(),
        ));

        // First tick at 600s relays the stripped text and asks for 45s,
        // which clamps to 60s.
        tokio::time::sleep(Duration::from_secs(610)).await;
        assert_eq!(delivered.lock().unwrap().clone(), vec!["Back soon.".to_string()]);

        tokio::time::sleep(Duration::from_secs(70)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(engine.tick.load(Ordering::SeqCst), 2);
        assert_eq!(
            delivered.lock().unwrap().clone(),
            vec!["Back soon.".to_string(), "second tick report".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_disables() {
        let engine = Arc::new(ScriptedEngine {
            replies: vec![],
            tick: AtomicUsize::new(0),
        });
        let cancel = CancellationToken::new();

        run_heartbeat(
            turns(Arc::clone(&engine)),
            Arc::clone(&engine),
            HeartbeatConfig {
                interval: Duration::ZERO,
            },
            RecordingSink::default(),
            cancel,
        )
        .await;

        assert_eq!(engine.tick.load(Ordering::SeqCst), 0);
    }
}

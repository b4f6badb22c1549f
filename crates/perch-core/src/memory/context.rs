//! Heartbeat context enrichment.
//!
//! A heartbeat prompt alone carries no state, so the tick text is extended
//! with the agent's task list, the latest continuation memory, and a few
//! recent high-importance memories before it reaches the engine.

use std::sync::Arc;

use tracing::debug;

use crate::memory::{truncate_chars, MemoryStore};

/// Supplies a rendered task list for heartbeat ticks. The bridge wires this
/// to whatever task tracking the deployment uses; `None` means no tasks.
pub type TaskListSource = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Number of high-importance memories appended to heartbeat context.
const TOP_MEMORIES: i64 = 3;

/// Each appended memory is clipped to this many characters.
const MEMORY_CHARS: usize = 500;

/// Append heartbeat context to the tick text: task list, latest
/// continuation, and top memories. Store failures degrade to whatever
/// sections could be built.
pub async fn enrich_heartbeat<M: MemoryStore>(
    store: &M,
    text: &str,
    tasks: Option<&TaskListSource>,
) -> String {
    let mut out = text.to_string();

    if let Some(tasks) = tasks
        && let Some(rendered) = tasks()
    {
        out.push_str("\n\n--- YOUR TASKS ---\n");
        out.push_str(&rendered);
    }

    match store.latest_continuation().await {
        Ok(Some(continuation)) if !continuation.content.is_empty() => {
            out.push_str("\n\n--- YOUR LAST SESSION ---\n");
            out.push_str(&continuation.content);
        }
        Ok(_) => {}
        Err(err) => debug!(error = %err, "continuation lookup failed"),
    }

    match store.top_memories(TOP_MEMORIES).await {
        Ok(memories) if !memories.is_empty() => {
            out.push_str("\n\n--- RECENT MEMORIES ---\n");
            for memory in &memories {
                out.push_str("- ");
                out.push_str(&truncate_chars(&memory.content, MEMORY_CHARS));
                out.push('\n');
            }
        }
        Ok(_) => {}
        Err(err) => debug!(error = %err, "memory highlights lookup failed"),
    }

    if out.len() != text.len() {
        debug!("heartbeat context enriched");
    }
    out
}

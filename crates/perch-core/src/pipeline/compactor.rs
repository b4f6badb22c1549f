//! Session compaction: summarize, re-seed, swap.

use perch_types::error::CompactionError;
use perch_types::memory::{MemoryEntry, MemoryKind};
use perch_types::session::short_session_id;
use tracing::{info, warn};

use crate::memory::MemoryStore;
use crate::pipeline::prompt::{build_compaction_prompt, render_transcript};
use crate::summarize::Summarizer;
use crate::upstream::AgentService;

/// Compact a session: summarize its transcript, persist the summary as a
/// memory, create a replacement session seeded with the summary, and delete
/// the old one. Returns the replacement session id.
///
/// Summarization or session-creation failure aborts the swap and leaves the
/// old session serving. Memory persistence and old-session deletion are
/// best-effort.
pub async fn compact<A, S, M>(
    agent: &A,
    summarizer: &S,
    memory: &M,
    principal_id: &str,
    old_session_id: &str,
) -> Result<String, CompactionError>
where
    A: AgentService,
    S: Summarizer,
    M: MemoryStore,
{
    let events = agent
        .session_events(principal_id, old_session_id)
        .await
        .map_err(|err| CompactionError::Transcript(err.to_string()))?;
    let transcript = render_transcript(&events);
    if transcript.is_empty() {
        return Err(CompactionError::EmptyTranscript);
    }

    let summary = summarizer
        .summarize(&build_compaction_prompt(&transcript))
        .await
        .map_err(CompactionError::Summarizer)?;

    let entry = MemoryEntry::new(
        summary.clone(),
        MemoryKind::Compaction,
        "session-compaction,context-summary".to_string(),
        5,
    );
    if let Err(err) = memory.save(&entry).await {
        warn!(error = %err, "compaction summary not persisted, continuing");
    }

    let session = agent
        .create_session(principal_id)
        .await
        .map_err(|err| CompactionError::SessionCreate(err.to_string()))?;

    // Seed the replacement session so the agent keeps its context. A failed
    // seed still leaves a usable session behind.
    let notice = compaction_notice(&summary);
    if let Err(err) = agent.run(principal_id, &session.id, &notice, None).await {
        warn!(error = %err, "summary injection failed, session still usable");
    }

    if let Err(err) = agent.delete_session(principal_id, old_session_id).await {
        warn!(
            error = %err,
            session_id = short_session_id(old_session_id),
            "old session not deleted"
        );
    }

    info!(
        old = short_session_id(old_session_id),
        new = session.short_id(),
        "session compacted"
    );
    Ok(session.id)
}

/// The synthetic first user turn injected into a freshly compacted session.
fn compaction_notice(summary: &str) -> String {
    format!(
        "[SYSTEM — Session Compaction]\nYour previous conversation was compacted to stay within \
         context limits. Here is the summary of everything that happened:\n\n{summary}\n\n\
         Continue from where you left off. The user's next message follows."
    )
}

//! Session and turn-result types.
//!
//! A `Session` is a server-side conversational context owned by the upstream
//! execution service. Perch caches at most one session id per principal; the
//! upstream copy is authoritative and may vanish across upstream restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::AgentEvent;

/// A remote session as reported by the upstream execution service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Upstream-assigned session identifier.
    pub id: String,
    /// The principal (end user or autonomous agent) this session belongs to.
    #[serde(rename = "userId")]
    pub principal_id: String,
    /// Last time the upstream recorded activity on this session.
    #[serde(rename = "lastUpdateTime")]
    pub last_update_time: Option<DateTime<Utc>>,
}

impl Session {
    /// First 8 characters of the session id, for log lines.
    pub fn short_id(&self) -> &str {
        short_session_id(&self.id)
    }
}

/// Truncate a session id to 8 characters for logging.
pub fn short_session_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// The result of one inbound turn through the middleware.
///
/// `session_id` differs from the caller-supplied id exactly when compaction
/// replaced the session during this turn -- the caller must update its cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    /// The agent's final reply text for this turn.
    pub text: String,
    /// The session id actually used for the turn.
    pub session_id: String,
    /// All structured events parsed from the upstream stream, in order.
    pub events: Vec<AgentEvent>,
}

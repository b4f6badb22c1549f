//! Memory types for associative recall and continuity injection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// What kind of memory a record is.
///
/// `Continuation` records what the agent was last doing (injected into
/// heartbeat turns); `Compaction` records a session summary produced when a
/// session was replaced. Anything else round-trips through `Other` so agent
/// tools can define their own categories without schema changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    General,
    Continuation,
    Compaction,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::General => write!(f, "general"),
            MemoryKind::Continuation => write!(f, "continuation"),
            MemoryKind::Compaction => write!(f, "compaction"),
            MemoryKind::Other(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for MemoryKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "general" => MemoryKind::General,
            "continuation" => MemoryKind::Continuation,
            "compaction" => MemoryKind::Compaction,
            other => MemoryKind::Other(other.to_string()),
        })
    }
}

/// A persistent memory record.
///
/// Created by compaction or by explicit agent action; never deleted
/// automatically. Importance (1..=5) and recency jointly rank retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub content: String,
    pub kind: MemoryKind,
    /// Comma-separated free-form tags.
    pub tags: String,
    pub importance: u8,
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    /// Create a new memory with a fresh time-sortable id.
    pub fn new(content: String, kind: MemoryKind, tags: String, importance: u8) -> Self {
        Self {
            id: Uuid::now_v7(),
            content,
            kind,
            tags,
            importance,
            created_at: Utc::now(),
        }
    }
}

/// A memory surfaced by full-text search, with its age in whole days.
#[derive(Debug, Clone)]
pub struct RecalledMemory {
    pub entry: MemoryEntry,
    pub days_ago: i64,
}

impl RecalledMemory {
    /// Human-relative age label: "today", "yesterday", or "N days ago".
    pub fn age_label(&self) -> String {
        match self.days_ago {
            0 => "today".to_string(),
            1 => "yesterday".to_string(),
            n => format!("{n} days ago"),
        }
    }
}

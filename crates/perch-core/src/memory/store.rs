//! Memory store trait definition.

use perch_types::error::RepositoryError;
use perch_types::memory::{MemoryEntry, RecalledMemory};

/// Repository trait for long-term memories.
///
/// Implementations live in perch-infra (SqliteMemoryStore). Memories are
/// append-only from the middleware's point of view; nothing here deletes.
pub trait MemoryStore: Send + Sync {
    /// Persist a memory entry.
    fn save(
        &self,
        entry: &MemoryEntry,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The most recently written continuation memory, if any.
    fn latest_continuation(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<MemoryEntry>, RepositoryError>> + Send;

    /// Top memories by importance then recency, excluding continuations.
    fn top_memories(
        &self,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<MemoryEntry>, RepositoryError>> + Send;

    /// Full-text search over memory content, ranked by relevance. Each hit
    /// carries its age in whole days.
    fn search(
        &self,
        keywords: &[String],
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<RecalledMemory>, RepositoryError>> + Send;
}

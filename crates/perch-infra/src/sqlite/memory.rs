//! SQLite memory store implementation.
//!
//! Implements `MemoryStore` from `perch-core` using sqlx with split
//! read/write pools. Full-text recall goes through the `memories_fts`
//! FTS5 shadow table kept in sync by triggers.

use chrono::{DateTime, NaiveDateTime, Utc};
use perch_core::memory::MemoryStore;
use perch_types::error::RepositoryError;
use perch_types::memory::{MemoryEntry, MemoryKind, RecalledMemory};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// Timestamp format used in the memories table. Kept SQLite-native so
/// `julianday()` can compute ages directly.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed implementation of `MemoryStore`.
pub struct SqliteMemoryStore {
    pool: DatabasePool,
}

impl SqliteMemoryStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct MemoryRow {
    id: String,
    content: String,
    kind: String,
    tags: String,
    importance: i64,
    created_at: String,
}

impl MemoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            kind: row.try_get("kind")?,
            tags: row.try_get("tags")?,
            importance: row.try_get("importance")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_entry(self) -> Result<MemoryEntry, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid memory id: {e}")))?;
        let created_at = parse_timestamp(&self.created_at)?;
        let kind = self.kind.parse().unwrap_or(MemoryKind::General);
        Ok(MemoryEntry {
            id,
            content: self.content,
            kind,
            tags: self.tags,
            importance: self.importance.clamp(0, u8::MAX as i64) as u8,
            created_at,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| RepositoryError::Query(format!("invalid created_at '{raw}': {e}")))
}

/// Build an FTS5 MATCH expression: each keyword quoted, OR-joined.
fn fts_query(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|kw| format!("\"{}\"", kw.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

impl MemoryStore for SqliteMemoryStore {
    async fn save(&self, entry: &MemoryEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO memories (id, content, kind, tags, importance, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(&entry.content)
        .bind(entry.kind.to_string())
        .bind(&entry.tags)
        .bind(entry.importance as i64)
        .bind(entry.created_at.format(TS_FORMAT).to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn latest_continuation(&self) -> Result<Option<MemoryEntry>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, content, kind, tags, importance, created_at
             FROM memories
             WHERE kind = 'continuation'
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| MemoryRow::from_row(&row))
            .transpose()
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .map(MemoryRow::into_entry)
            .transpose()
    }

    async fn top_memories(&self, limit: i64) -> Result<Vec<MemoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, content, kind, tags, importance, created_at
             FROM memories
             WHERE kind != 'continuation'
             ORDER BY importance DESC, created_at DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                MemoryRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_entry()
            })
            .collect()
    }

    async fn search(
        &self,
        keywords: &[String],
        limit: i64,
    ) -> Result<Vec<RecalledMemory>, RepositoryError> {
        if keywords.is_empty() {
            return Ok(vec![]);
        }

        let rows = sqlx::query(
            "SELECT m.id, m.content, m.kind, m.tags, m.importance, m.created_at,
                    CAST((julianday('now') - julianday(m.created_at)) AS INTEGER) AS days_ago
             FROM memories_fts f
             JOIN memories m ON m.rowid = f.rowid
             WHERE memories_fts MATCH ?
             ORDER BY rank
             LIMIT ?",
        )
        .bind(fts_query(keywords))
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let days_ago: i64 = row
                    .try_get("days_ago")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let entry = MemoryRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_entry()?;
                Ok(RecalledMemory { entry, days_ago })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, SqliteMemoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("mem.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, SqliteMemoryStore::new(pool))
    }

    fn entry(content: &str, kind: MemoryKind, importance: u8) -> MemoryEntry {
        MemoryEntry::new(content.to_string(), kind, String::new(), importance)
    }

    #[tokio::test]
    async fn test_save_and_latest_continuation() {
        let (_dir, store) = store().await;
        assert!(store.latest_continuation().await.unwrap().is_none());

        let mut first = entry("was fixing the build", MemoryKind::Continuation, 3);
        first.created_at = Utc::now() - chrono::Duration::hours(2);
        store.save(&first).await.unwrap();
        let second = entry("started the release checklist", MemoryKind::Continuation, 3);
        store.save(&second).await.unwrap();

        let latest = store.latest_continuation().await.unwrap().unwrap();
        assert_eq!(latest.content, "started the release checklist");
        assert_eq!(latest.kind, MemoryKind::Continuation);
    }

    #[tokio::test]
    async fn test_top_memories_excludes_continuations() {
        let (_dir, store) = store().await;
        store
            .save(&entry("continuation note", MemoryKind::Continuation, 5))
            .await
            .unwrap();
        store
            .save(&entry("important fact", MemoryKind::General, 5))
            .await
            .unwrap();
        store
            .save(&entry("minor detail", MemoryKind::General, 1))
            .await
            .unwrap();

        let top = store.top_memories(3).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].content, "important fact");
        assert!(top.iter().all(|m| m.kind != MemoryKind::Continuation));
    }

    #[tokio::test]
    async fn test_search_matches_keywords_with_age() {
        let (_dir, store) = store().await;
        let mut old = entry(
            "user paid 0.02 BCH for three months of hosting",
            MemoryKind::General,
            4,
        );
        old.created_at = Utc::now() - chrono::Duration::days(3);
        store.save(&old).await.unwrap();
        store
            .save(&entry("likes espresso", MemoryKind::General, 2))
            .await
            .unwrap();

        let hits = store
            .search(&["bch".to_string(), "hosting".to_string()], 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].entry.content.contains("BCH"));
        assert_eq!(hits[0].days_ago, 3);
        assert_eq!(hits[0].age_label(), "3 days ago");
    }

    #[tokio::test]
    async fn test_search_caps_results_at_limit() {
        let (_dir, store) = store().await;
        for i in 0..5 {
            store
                .save(&entry(
                    &format!("deploy pipeline note {i}"),
                    MemoryKind::General,
                    3,
                ))
                .await
                .unwrap();
        }

        let hits = store
            .search(&["deploy".to_string(), "pipeline".to_string()], 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_search_quotes_hostile_keywords() {
        let (_dir, store) = store().await;
        store
            .save(&entry("nothing here", MemoryKind::General, 3))
            .await
            .unwrap();

        // FTS5 operators and quotes must be treated as literals.
        let hits = store
            .search(&["near(\"x\"".to_string(), "and".to_string()], 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_keywords_returns_nothing() {
        let (_dir, store) = store().await;
        assert!(store.search(&[], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_kind_round_trips() {
        let (_dir, store) = store().await;
        store
            .save(&entry(
                "observed a flaky webhook",
                MemoryKind::Other("observation".to_string()),
                3,
            ))
            .await
            .unwrap();

        let top = store.top_memories(1).await.unwrap();
        assert_eq!(top[0].kind, MemoryKind::Other("observation".to_string()));
    }
}

//! Chat history persistence
//!
//! Repository for conversation records and summary checkpoints. The
//! memory-budget controller is the only writer of checkpoints; turns are
//! appended after every exchange. `read_history` returns the compacted view
//! the rest of the engine works with: the active checkpoint's summary (if
//! any) followed by the raw turns recorded after it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// One persisted conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// The active summary checkpoint of a session
///
/// Everything up to and including `up_to_message_id` is represented by
/// `summary`; there is at most one checkpoint per session, superseded in
/// place when compaction re-triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryCheckpoint {
    pub session_id: String,
    pub summary: String,
    pub up_to_message_id: i64,
    pub created_at: String,
}

/// Compacted view of a session's history
#[derive(Debug, Clone)]
pub struct HistoryView {
    /// Summary of everything before the raw turns, if a checkpoint exists
    pub summary: Option<String>,

    /// Raw turns after the active checkpoint (all turns when none exists)
    pub turns: Vec<TurnRecord>,
}

/// Repository for chat history operations
#[derive(Clone)]
pub struct ChatHistoryRepository {
    pool: SqlitePool,
}

impl ChatHistoryRepository {
    /// Create a new chat history repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the session row if it doesn't exist yet
    pub async fn ensure_session(&self, session_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO chat_sessions (session_id) VALUES (?)")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .context("Failed to ensure session")?;
        Ok(())
    }

    /// Append one turn to the session, returning the new message id
    pub async fn append_turn(&self, session_id: &str, role: &str, content: &str) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content) VALUES (?, ?, ?)",
        )
        .bind(session_id)
        .bind(role)
        .bind(content)
        .execute(&self.pool)
        .await
        .context("Failed to append turn")?;

        sqlx::query("UPDATE chat_sessions SET updated_at = datetime('now') WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .context("Failed to touch session")?;

        Ok(result.last_insert_rowid())
    }

    /// The active checkpoint for a session, if any
    pub async fn latest_checkpoint(&self, session_id: &str) -> Result<Option<SummaryCheckpoint>> {
        let row = sqlx::query(
            "SELECT session_id, summary, up_to_message_id, created_at \
             FROM summary_checkpoints WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read checkpoint")?;

        Ok(row.map(|r| SummaryCheckpoint {
            session_id: r.get("session_id"),
            summary: r.get("summary"),
            up_to_message_id: r.get("up_to_message_id"),
            created_at: r.get("created_at"),
        }))
    }

    /// Write (or supersede) the session's checkpoint
    pub async fn write_checkpoint(
        &self,
        session_id: &str,
        summary: &str,
        up_to_message_id: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO summary_checkpoints \
             (session_id, summary, up_to_message_id, created_at) \
             VALUES (?, ?, ?, datetime('now'))",
        )
        .bind(session_id)
        .bind(summary)
        .bind(up_to_message_id)
        .execute(&self.pool)
        .await
        .context("Failed to write checkpoint")?;

        Ok(())
    }

    /// Raw turns recorded after the given message id, in insertion order
    pub async fn turns_after(&self, session_id: &str, after_id: i64) -> Result<Vec<TurnRecord>> {
        let rows = sqlx::query(
            "SELECT id, role, content, created_at FROM chat_messages \
             WHERE session_id = ? AND id > ? ORDER BY id",
        )
        .bind(session_id)
        .bind(after_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read turns")?;

        Ok(rows
            .into_iter()
            .map(|r| TurnRecord {
                id: r.get("id"),
                role: r.get("role"),
                content: r.get("content"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Compacted view: active summary plus post-checkpoint raw turns
    pub async fn read_history(&self, session_id: &str) -> Result<HistoryView> {
        let checkpoint = self.latest_checkpoint(session_id).await?;
        let after_id = checkpoint.as_ref().map(|c| c.up_to_message_id).unwrap_or(0);
        let turns = self.turns_after(session_id, after_id).await?;

        Ok(HistoryView {
            summary: checkpoint.map(|c| c.summary),
            turns,
        })
    }

    /// Total characters of raw text recorded since the active checkpoint
    pub async fn text_length_since_checkpoint(&self, session_id: &str) -> Result<i64> {
        let checkpoint = self.latest_checkpoint(session_id).await?;
        let after_id = checkpoint.as_ref().map(|c| c.up_to_message_id).unwrap_or(0);

        let length: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(LENGTH(content)) FROM chat_messages WHERE session_id = ? AND id > ?",
        )
        .bind(session_id)
        .bind(after_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to measure history length")?;

        Ok(length.unwrap_or(0))
    }

    /// Number of turns recorded for a session (before any compaction view)
    pub async fn turn_count(&self, session_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE session_id = ?")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count turns")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn append_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("t.db")).await.unwrap();
        let history = db.history();

        history.ensure_session("s1").await.unwrap();
        history.append_turn("s1", "user", "hello").await.unwrap();
        history.append_turn("s1", "assistant", "hi there").await.unwrap();

        let view = history.read_history("s1").await.unwrap();
        assert!(view.summary.is_none());
        assert_eq!(view.turns.len(), 2);
        assert_eq!(view.turns[0].role, "user");
        assert_eq!(view.turns[1].content, "hi there");
    }

    #[tokio::test]
    async fn checkpoint_splits_history_view() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("t.db")).await.unwrap();
        let history = db.history();

        history.ensure_session("s1").await.unwrap();
        let first = history.append_turn("s1", "user", "aaa").await.unwrap();
        history.append_turn("s1", "assistant", "bbb").await.unwrap();

        history
            .write_checkpoint("s1", "summary of aaa", first)
            .await
            .unwrap();

        let view = history.read_history("s1").await.unwrap();
        assert_eq!(view.summary.as_deref(), Some("summary of aaa"));
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.turns[0].content, "bbb");

        // text length counts only post-checkpoint turns
        let length = history.text_length_since_checkpoint("s1").await.unwrap();
        assert_eq!(length, 3);
    }

    #[tokio::test]
    async fn checkpoint_supersedes_in_place() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("t.db")).await.unwrap();
        let history = db.history();

        history.ensure_session("s1").await.unwrap();
        let a = history.append_turn("s1", "user", "one").await.unwrap();
        let b = history.append_turn("s1", "user", "two").await.unwrap();

        history.write_checkpoint("s1", "first", a).await.unwrap();
        history.write_checkpoint("s1", "second", b).await.unwrap();

        let checkpoint = history.latest_checkpoint("s1").await.unwrap().unwrap();
        assert_eq!(checkpoint.summary, "second");
        assert_eq!(checkpoint.up_to_message_id, b);

        // one row per session, not a stack
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM summary_checkpoints WHERE session_id = 's1'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("t.db")).await.unwrap();
        let history = db.history();

        history.ensure_session("a").await.unwrap();
        history.ensure_session("b").await.unwrap();
        history.append_turn("a", "user", "for a").await.unwrap();
        history.append_turn("b", "user", "for b").await.unwrap();

        let view_a = history.read_history("a").await.unwrap();
        let view_b = history.read_history("b").await.unwrap();
        assert_eq!(view_a.turns.len(), 1);
        assert_eq!(view_b.turns.len(), 1);
        assert_eq!(view_a.turns[0].content, "for a");
        assert_eq!(view_b.turns[0].content, "for b");
    }
}

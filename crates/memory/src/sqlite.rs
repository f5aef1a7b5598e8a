//! SQLite session store.
//!
//! One table, `sessions`, keyed by sender id. The primary key plus
//! `ON CONFLICT DO NOTHING` gives an atomic create-if-absent that also
//! holds across processes sharing the database file.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use wabridge_core::error::SessionError;
use wabridge_core::session::{SessionRecord, SessionStore};

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Missing parent directories are created.
    pub async fn open(path: &Path) -> Result<Self, SessionError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SessionError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let store = Self::connect(options).await?;
        info!("SQLite session store initialized at {}", path.display());
        Ok(store)
    }

    /// An ephemeral in-process database (useful for tests).
    pub async fn in_memory() -> Result<Self, SessionError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| SessionError::Storage(format!("Invalid SQLite path: {e}")))?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, SessionError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| SessionError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                sender_id       TEXT PRIMARY KEY NOT NULL,
                session_handle  TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::MigrationFailed(format!("sessions table: {e}")))?;

        debug!("SQLite session migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, SessionError> {
        let sender_id: String = row
            .try_get("sender_id")
            .map_err(|e| SessionError::QueryFailed(format!("sender_id column: {e}")))?;
        let session_handle: String = row
            .try_get("session_handle")
            .map_err(|e| SessionError::QueryFailed(format!("session_handle column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| SessionError::QueryFailed(format!("created_at column: {e}")))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SessionError::QueryFailed(format!("created_at value: {e}")))?;

        Ok(SessionRecord {
            sender_id,
            session_handle,
            created_at,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, sender_id: &str) -> Result<Option<String>, SessionError> {
        let row = sqlx::query("SELECT session_handle FROM sessions WHERE sender_id = ?1")
            .bind(sender_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::QueryFailed(format!("SELECT failed: {e}")))?;

        row.map(|r| {
            r.try_get::<String, _>("session_handle")
                .map_err(|e| SessionError::QueryFailed(format!("session_handle column: {e}")))
        })
        .transpose()
    }

    async fn put_if_absent(&self, sender_id: &str, handle: &str) -> Result<String, SessionError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO sessions (sender_id, session_handle, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(sender_id) DO NOTHING
            "#,
        )
        .bind(sender_id)
        .bind(handle)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("INSERT failed: {e}")))?
        .rows_affected();

        if inserted == 1 {
            debug!(sender_id, "Stored new session");
            return Ok(handle.to_string());
        }

        // Lost the race (or the sender already had a session): the stored row wins.
        self.get(sender_id)
            .await?
            .ok_or_else(|| SessionError::Storage(format!("session for {sender_id} vanished")))
    }

    async fn list(&self) -> Result<Vec<SessionRecord>, SessionError> {
        let rows = sqlx::query(
            "SELECT sender_id, session_handle, created_at FROM sessions ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SessionError::QueryFailed(format!("List failed: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        assert_eq!(store.get("5511").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stored_handle_is_never_overwritten() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        assert_eq!(store.put_if_absent("5511", "thread_a").await.unwrap(), "thread_a");
        assert_eq!(store.put_if_absent("5511", "thread_b").await.unwrap(), "thread_a");
        assert_eq!(store.get("5511").await.unwrap().as_deref(), Some("thread_a"));

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sender_id, "5511");
        assert_eq!(records[0].session_handle, "thread_a");
    }

    #[tokio::test]
    async fn sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");

        {
            let store = SqliteSessionStore::open(&path).await.unwrap();
            store.put_if_absent("alice", "thread_alice").await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteSessionStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("alice").await.unwrap().as_deref(),
            Some("thread_alice")
        );
        assert_eq!(
            reopened.put_if_absent("alice", "thread_other").await.unwrap(),
            "thread_alice"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_contact_agrees_on_one_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteSessionStore::open(&dir.path().join("race.db")).await.unwrap());

        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.put_if_absent("same-sender", &format!("thread_{i}")).await.unwrap()
            }));
        }

        let mut winners = Vec::new();
        for t in tasks {
            winners.push(t.await.unwrap());
        }
        winners.dedup();
        assert_eq!(winners.len(), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}

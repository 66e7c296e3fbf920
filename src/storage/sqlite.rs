use crate::error::{DisaError, Result};
use crate::storage::backend::StorageBackend;
use crate::storage::types::{Conversation, ConversationMetadata, StorageUsage};
use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_activity TEXT,
        model TEXT NOT NULL,
        message_count INTEGER NOT NULL,
        is_favorite INTEGER,
        record JSON NOT NULL
    );
    CREATE TABLE IF NOT EXISTS conversation_metadata (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        model TEXT NOT NULL,
        message_count INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_conversation_metadata_updated_at
        ON conversation_metadata (updated_at);
";

/// SQLite-backed conversation store
///
/// Holds one connection for the lifetime of the backend. Blocking database
/// work runs on the tokio blocking pool.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open (or create) the database at `db_path`
    ///
    /// # Examples
    ///
    /// ```
    /// use disa_store::storage::SqliteBackend;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let backend = SqliteBackend::open(dir.path().join("conversations.db")).unwrap();
    /// assert!(backend.db_path().is_some());
    /// ```
    pub fn open<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists so opening the DB file succeeds.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| DisaError::Storage(e.to_string()))?;
        }

        let conn = Connection::open(&db_path)
            .context("Failed to open database")
            .map_err(|e| DisaError::Storage(e.to_string()))?;

        Self::with_connection(conn, Some(db_path))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")
            .map_err(|e| DisaError::Storage(e.to_string()))?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create tables")
            .map_err(|e| DisaError::Storage(e.to_string()))?;

        tracing::debug!(path = ?db_path, "Opened conversation database");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    /// Location of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| DisaError::Storage("Database connection lock poisoned".into()))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| DisaError::Storage(format!("Storage task failed: {}", e)))?
    }
}

fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationMetadata> {
    let message_count: i64 = row.get(5)?;
    Ok(ConversationMetadata {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        model: row.get(4)?,
        message_count: message_count.max(0) as usize,
    })
}

fn decode_record(id: &str, record_json: &str) -> Result<Conversation> {
    serde_json::from_str(record_json)
        .with_context(|| format!("Failed to deserialize conversation {}", id))
        .map_err(|e| DisaError::Storage(e.to_string()).into())
}

fn write_metadata(conn: &Connection, metadata: &ConversationMetadata) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO conversation_metadata
            (id, title, created_at, updated_at, model, message_count)
        VALUES (?, ?, ?, ?, ?, ?)",
        params![
            metadata.id,
            metadata.title,
            metadata.created_at,
            metadata.updated_at,
            metadata.model,
            metadata.message_count as i64
        ],
    )
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load_conversations(&self) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, record FROM conversations ORDER BY id")
                .context("Failed to prepare statement")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .context("Failed to query conversations")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            let mut conversations = Vec::new();
            for row in rows {
                let (id, record) = row
                    .context("Failed to read conversation row")
                    .map_err(|e| DisaError::Storage(e.to_string()))?;
                conversations.push(decode_record(&id, &record)?);
            }
            Ok(conversations)
        })
        .await
    }

    async fn load_metadata(&self) -> Result<Vec<ConversationMetadata>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, created_at, updated_at, model, message_count
                    FROM conversation_metadata
                    ORDER BY updated_at DESC",
                )
                .context("Failed to prepare statement")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], metadata_from_row)
                .context("Failed to query metadata")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            let mut metadata = Vec::new();
            for row in rows {
                metadata.push(
                    row.context("Failed to read metadata row")
                        .map_err(|e| DisaError::Storage(e.to_string()))?,
                );
            }
            Ok(metadata)
        })
        .await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let record: Option<String> = conn
                .query_row(
                    "SELECT record FROM conversations WHERE id = ?",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to query conversation")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            record.map(|json| decode_record(&id, &json)).transpose()
        })
        .await
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<ConversationMetadata>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, title, created_at, updated_at, model, message_count
                FROM conversation_metadata WHERE id = ?",
                params![id],
                metadata_from_row,
            )
            .optional()
            .context("Failed to query metadata")
            .map_err(|e| anyhow::Error::from(DisaError::Storage(e.to_string())))
        })
        .await
    }

    async fn put_conversation(&self, conversation: &Conversation) -> Result<()> {
        let conversation = conversation.clone();
        self.with_conn(move |conn| {
            let record = serde_json::to_string(&conversation)
                .context("Failed to serialize conversation")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            let tx = conn
                .transaction()
                .context("Failed to start transaction")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            tx.execute(
                "INSERT OR REPLACE INTO conversations
                    (id, title, created_at, updated_at, last_activity, model,
                     message_count, is_favorite, record)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    conversation.id,
                    conversation.title,
                    conversation.created_at,
                    conversation.updated_at,
                    conversation.last_activity,
                    conversation.model,
                    conversation.message_count as i64,
                    conversation.is_favorite,
                    record
                ],
            )
            .context("Failed to write conversation")
            .map_err(|e| DisaError::Storage(e.to_string()))?;

            write_metadata(&tx, &ConversationMetadata::from(&conversation))
                .context("Failed to write conversation metadata")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            tx.commit()
                .context("Failed to commit transaction")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            Ok(())
        })
        .await
    }

    async fn put_metadata(&self, metadata: &ConversationMetadata) -> Result<()> {
        let metadata = metadata.clone();
        self.with_conn(move |conn| {
            write_metadata(conn, &metadata)
                .context("Failed to write conversation metadata")
                .map_err(|e| DisaError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn delete_conversations(&self, ids: &[String]) -> Result<()> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .context("Failed to start transaction")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            for id in &ids {
                tx.execute("DELETE FROM conversations WHERE id = ?", params![id])
                    .context("Failed to delete conversation")
                    .map_err(|e| DisaError::Storage(e.to_string()))?;
                tx.execute(
                    "DELETE FROM conversation_metadata WHERE id = ?",
                    params![id],
                )
                .context("Failed to delete conversation metadata")
                .map_err(|e| DisaError::Storage(e.to_string()))?;
            }

            tx.commit()
                .context("Failed to commit transaction")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn
                .transaction()
                .context("Failed to start transaction")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            tx.execute_batch("DELETE FROM conversations; DELETE FROM conversation_metadata;")
                .context("Failed to clear tables")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            tx.commit()
                .context("Failed to commit transaction")
                .map_err(|e| DisaError::Storage(e.to_string()))?;

            Ok(())
        })
        .await
    }

    async fn estimate_usage(&self) -> Result<Option<StorageUsage>> {
        self.with_conn(|conn| {
            let pragma = |name: &str| -> Result<u64> {
                let value: i64 = conn
                    .query_row(&format!("PRAGMA {}", name), [], |row| row.get(0))
                    .with_context(|| format!("Failed to read PRAGMA {}", name))
                    .map_err(|e| DisaError::Storage(e.to_string()))?;
                Ok(value.max(0) as u64)
            };

            let page_size = pragma("page_size")?;
            let used = pragma("page_count")? * page_size;
            let quota = pragma("max_page_count")?.saturating_mul(page_size);

            Ok(Some(StorageUsage { used, quota }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    /// Helper: create a temporary backend backed by a temp directory.
    ///
    /// Returns both the backend and the `TempDir` so the caller keeps
    /// ownership of the directory (preventing it from being removed).
    fn create_test_backend() -> (SqliteBackend, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let backend =
            SqliteBackend::open(dir.path().join("conversations.db")).expect("open backend");
        (backend, dir)
    }

    fn conversation(id: &str, updated_at: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: format!("Title {}", id),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: updated_at.to_string(),
            model: "gpt-4".to_string(),
            message_count: 1,
            messages: Some(vec![json!({"role": "user", "content": "hi"})]),
            ..Default::default()
        }
    }

    fn table_count(backend: &SqliteBackend, table: &str) -> i64 {
        let conn = backend.conn.lock().expect("lock");
        conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |r| r.get(0))
            .expect("count")
    }

    #[test]
    fn test_open_creates_both_tables() {
        let (backend, _dir) = create_test_backend();
        let conn = backend.conn.lock().expect("lock");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('conversations', 'conversation_metadata')",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("deeper").join("store.db");
        let backend = SqliteBackend::open(&db_path).expect("open");
        assert_eq!(backend.db_path(), Some(db_path.as_path()));
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_put_writes_record_and_metadata() {
        let (backend, _dir) = create_test_backend();
        backend
            .put_conversation(&conversation("a", "2024-01-01T00:00:00Z"))
            .await
            .expect("put");

        assert_eq!(table_count(&backend, "conversations"), 1);
        assert_eq!(table_count(&backend, "conversation_metadata"), 1);

        let loaded = backend.get_conversation("a").await.expect("get").expect("row");
        assert_eq!(loaded.title, "Title a");
        assert_eq!(loaded.actual_message_count(), 1);

        let meta = backend.get_metadata("a").await.expect("meta").expect("row");
        assert_eq!(meta.title, "Title a");
    }

    #[tokio::test]
    async fn test_put_replaces_existing_row() {
        let (backend, _dir) = create_test_backend();
        let mut conv = conversation("a", "2024-01-01T00:00:00Z");
        backend.put_conversation(&conv).await.expect("put");

        conv.title = "Renamed".to_string();
        backend.put_conversation(&conv).await.expect("put again");

        assert_eq!(table_count(&backend, "conversations"), 1);
        let meta = backend.get_metadata("a").await.expect("meta").expect("row");
        assert_eq!(meta.title, "Renamed");
    }

    #[tokio::test]
    async fn test_load_metadata_orders_most_recent_first() {
        let (backend, _dir) = create_test_backend();
        backend
            .put_conversation(&conversation("old", "2024-01-01T00:00:00Z"))
            .await
            .expect("put old");
        backend
            .put_conversation(&conversation("new", "2024-06-01T00:00:00Z"))
            .await
            .expect("put new");

        let listing = backend.load_metadata().await.expect("list");
        let ids: Vec<_> = listing.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_delete_removes_both_rows() {
        let (backend, _dir) = create_test_backend();
        backend
            .put_conversation(&conversation("a", "2024-01-01T00:00:00Z"))
            .await
            .expect("put");
        backend
            .delete_conversations(&["a".to_string()])
            .await
            .expect("delete");

        assert!(backend.get_conversation("a").await.expect("get").is_none());
        assert!(backend.get_metadata("a").await.expect("meta").is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_not_an_error() {
        let (backend, _dir) = create_test_backend();
        backend
            .delete_conversations(&["missing".to_string()])
            .await
            .expect("delete");
    }

    #[tokio::test]
    async fn test_clear_empties_both_tables() {
        let (backend, _dir) = create_test_backend();
        for id in ["a", "b", "c"] {
            backend
                .put_conversation(&conversation(id, "2024-01-01T00:00:00Z"))
                .await
                .expect("put");
        }
        backend.clear().await.expect("clear");
        assert_eq!(table_count(&backend, "conversations"), 0);
        assert_eq!(table_count(&backend, "conversation_metadata"), 0);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("conversations.db");
        {
            let backend = SqliteBackend::open(&db_path).expect("open");
            backend
                .put_conversation(&conversation("persist", "2024-01-01T00:00:00Z"))
                .await
                .expect("put");
        }
        let reopened = SqliteBackend::open(&db_path).expect("reopen");
        let all = reopened.load_conversations().await.expect("load");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "persist");
    }

    #[tokio::test]
    async fn test_estimate_usage_reports_pages() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let usage = backend
            .estimate_usage()
            .await
            .expect("usage")
            .expect("estimate available");
        assert!(usage.quota >= usage.used);
    }
}

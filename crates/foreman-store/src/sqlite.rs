//! Durable `SQLite`-backed documents and message logs.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::debug;

use async_trait::async_trait;
use foreman_core::messages::ChatMessage;

use crate::errors::StoreError;
use crate::traits::{DocumentStore, MessageLog};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    key         TEXT NOT NULL,
    body        TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (collection, key)
);
CREATE TABLE IF NOT EXISTS messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  TEXT NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages (session_id, id);
";

/// [`DocumentStore`] and [`MessageLog`] over a single `SQLite` database.
///
/// Access is serialized by a mutex; the workload is one small statement per
/// call, so contention is not a concern at this scale.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        debug!(?path, "opened sqlite store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn.lock();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, collection: &str, key: &str, doc: &Value) -> Result<(), StoreError> {
        let body = serde_json::to_string(doc)?;
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        let _ = conn.execute(
            "INSERT INTO documents (collection, key, body, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (collection, key) DO UPDATE SET body = ?3, updated_at = ?4",
            params![collection, key, body, now],
        )?;
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let affected = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        Ok(affected > 0)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT body FROM documents WHERE collection = ?1 ORDER BY key",
        )?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
        let mut docs = Vec::new();
        for raw in rows {
            docs.push(serde_json::from_str(&raw?)?);
        }
        Ok(docs)
    }
}

#[async_trait]
impl MessageLog for SqliteStore {
    async fn append(&self, session_id: &str, message: &ChatMessage) -> Result<(), StoreError> {
        let body = serde_json::to_string(message)?;
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        let _ = conn.execute(
            "INSERT INTO messages (session_id, body, created_at) VALUES (?1, ?2, ?3)",
            params![session_id, body, now],
        )?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT body FROM messages WHERE session_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;
        let mut messages = Vec::new();
        for raw in rows {
            messages.push(serde_json::from_str(&raw?)?);
        }
        Ok(messages)
    }

    async fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let _ = conn
            .execute("DELETE FROM messages WHERE session_id = ?1", params![session_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("tasks", "t1", &json!({"title": "Ship it"})).await.unwrap();
        let doc = store.get("tasks", "t1").await.unwrap();
        assert_eq!(doc, Some(json!({"title": "Ship it"})));
    }

    #[tokio::test]
    async fn put_overwrites_existing() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("tasks", "t1", &json!({"v": 1})).await.unwrap();
        store.put("tasks", "t1", &json!({"v": 2})).await.unwrap();
        assert_eq!(store.get("tasks", "t1").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(store.list("tasks").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("tasks", "t1", &json!({})).await.unwrap();
        assert!(store.delete("tasks", "t1").await.unwrap());
        assert!(!store.delete("tasks", "t1").await.unwrap());
    }

    #[tokio::test]
    async fn message_log_preserves_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.append("s1", &ChatMessage::user(format!("m{i}"))).await.unwrap();
        }
        let log = store.load("s1").await.unwrap();
        assert_eq!(log.len(), 5);
        assert_eq!(log[0].content, "m0");
        assert_eq!(log[4].content, "m4");

        store.clear("s1").await.unwrap();
        assert!(store.load("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopen_preserves_documents() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("foreman.db");
        {
            let store = SqliteStore::open(&db).unwrap();
            store.put("tasks", "t1", &json!({"title": "persisted"})).await.unwrap();
        }
        let store = SqliteStore::open(&db).unwrap();
        assert_eq!(
            store.get("tasks", "t1").await.unwrap(),
            Some(json!({"title": "persisted"}))
        );
    }
}

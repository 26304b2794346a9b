//! In-memory backends, used by tests and by degraded mode (no data
//! directory configured).

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use foreman_core::messages::ChatMessage;

use crate::errors::StoreError;
use crate::traits::{DocumentStore, MemoryHit, MemoryRecall, MessageLog};

/// In-memory [`DocumentStore`] and [`MessageLog`].
///
/// Nothing survives a restart; suitable for tests and for running without
/// a configured data directory.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<(String, String), Value>>,
    messages: Mutex<BTreeMap<String, Vec<ChatMessage>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let docs = self.documents.lock();
        Ok(docs.get(&(collection.to_string(), key.to_string())).cloned())
    }

    async fn put(&self, collection: &str, key: &str, doc: &Value) -> Result<(), StoreError> {
        let mut docs = self.documents.lock();
        let _ = docs.insert((collection.to_string(), key.to_string()), doc.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let mut docs = self.documents.lock();
        Ok(docs.remove(&(collection.to_string(), key.to_string())).is_some())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let docs = self.documents.lock();
        Ok(docs
            .iter()
            .filter(|((coll, _), _)| coll == collection)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

#[async_trait]
impl MessageLog for MemoryStore {
    async fn append(&self, session_id: &str, message: &ChatMessage) -> Result<(), StoreError> {
        let mut logs = self.messages.lock();
        logs.entry(session_id.to_string()).or_default().push(message.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let logs = self.messages.lock();
        Ok(logs.get(session_id).cloned().unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        let mut logs = self.messages.lock();
        let _ = logs.remove(session_id);
        Ok(())
    }
}

/// Fixed-answer [`MemoryRecall`] for tests: returns the configured hits for
/// every query and records the queries it saw.
#[derive(Default)]
pub struct StaticRecall {
    hits: Vec<MemoryHit>,
    queries: Mutex<Vec<String>>,
}

impl StaticRecall {
    /// A recall backend that always answers with `hits`.
    pub fn with_hits(hits: Vec<MemoryHit>) -> Self {
        Self { hits, queries: Mutex::new(Vec::new()) }
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl MemoryRecall for StaticRecall {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>, StoreError> {
        self.queries.lock().push(query.to_string());
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

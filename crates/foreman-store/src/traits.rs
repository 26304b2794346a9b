//! Storage trait seams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use foreman_core::messages::ChatMessage;

use crate::errors::StoreError;

/// Whole-document key/value JSON storage.
///
/// The orchestration core's only transaction semantics are "load whole
/// document, mutate, write whole document"; callers serialize access at a
/// higher level (one request per session at a time).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by collection and key.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write (or overwrite) a document.
    async fn put(&self, collection: &str, key: &str, doc: &Value) -> Result<(), StoreError>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError>;

    /// List every document in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}

/// Append-only per-session message history.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Append one message to a session's log.
    async fn append(&self, session_id: &str, message: &ChatMessage) -> Result<(), StoreError>;

    /// Load a session's full log in append order.
    async fn load(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// Drop a session's log.
    async fn clear(&self, session_id: &str) -> Result<(), StoreError>;
}

/// What a path refers to in an object store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entry {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// Nothing at this path.
    Missing,
}

/// A file entry in a directory listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name (not the full path).
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// ISO 8601 last-modified timestamp.
    pub modified: String,
}

/// A directory listing: subdirectory names and file entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirListing {
    /// Subdirectory names.
    pub directories: Vec<String>,
    /// Files with size and modification time.
    pub files: Vec<FileEntry>,
}

/// Hierarchical blob storage. The orchestration core treats this purely as
/// a namespace; the wire protocol behind it is not its concern.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a directory (and any missing parents).
    async fn mkdir(&self, path: &str) -> Result<(), StoreError>;

    /// List a directory.
    async fn read_dir(&self, path: &str) -> Result<DirListing, StoreError>;

    /// Read a file as UTF-8 text.
    async fn read_text(&self, path: &str) -> Result<String, StoreError>;

    /// Write a file, creating parent directories as needed.
    async fn write(&self, path: &str, content: &str, mime_type: &str)
    -> Result<(), StoreError>;

    /// What, if anything, exists at this path.
    async fn exists(&self, path: &str) -> Result<Entry, StoreError>;

    /// Delete a file or (recursively) a directory.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}

/// One hit from the vector-search memory backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryHit {
    /// Recalled content.
    pub content: String,
    /// Similarity score in `[0, 1]`.
    pub score: f32,
    /// Where the memory came from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Vector-search memory client. Optional — sessions run without one.
#[async_trait]
pub trait MemoryRecall: Send + Sync {
    /// Search memories semantically related to `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>, StoreError>;
}

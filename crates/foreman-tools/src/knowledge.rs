//! `search_knowledge` tool: substring search over the `knowledge/` tree in
//! object storage.

use std::collections::VecDeque;

use serde_json::json;
use tracing::debug;

use foreman_core::tools::{ERR_STORAGE_NOT_AVAILABLE, ToolResult};
use foreman_store::ObjectStore;

use crate::errors::ToolError;
use crate::request::QueryArgs;

const KNOWLEDGE_ROOT: &str = "knowledge";
const DEFAULT_LIMIT: usize = 10;
/// Scan ceiling so a huge tree cannot stall a turn.
const MAX_FILES_SCANNED: usize = 200;

/// One knowledge-tree match.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeHit {
    /// Path of the matching file, relative to the store root.
    pub path: String,
    /// First line containing the query.
    pub line: String,
}

/// Run `search_knowledge` over the object store's knowledge tree.
pub async fn execute(
    objects: Option<&dyn ObjectStore>,
    args: &QueryArgs,
) -> Result<ToolResult, ToolError> {
    let Some(objects) = objects else {
        return Ok(ToolResult::failure(
            ERR_STORAGE_NOT_AVAILABLE,
            "Knowledge search requires object storage, which is not configured",
        ));
    };

    let limit = args.limit.unwrap_or(DEFAULT_LIMIT);
    let needle = args.query.to_lowercase();
    let mut hits: Vec<KnowledgeHit> = Vec::new();
    let mut scanned = 0_usize;

    // Breadth-first walk from the knowledge root.
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(KNOWLEDGE_ROOT.to_string());
    while let Some(dir) = queue.pop_front() {
        let listing = match objects.read_dir(&dir).await {
            Ok(listing) => listing,
            // An absent knowledge tree just means zero results.
            Err(foreman_store::StoreError::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        };
        for sub in listing.directories {
            queue.push_back(format!("{dir}/{sub}"));
        }
        for file in listing.files {
            if scanned >= MAX_FILES_SCANNED || hits.len() >= limit {
                break;
            }
            scanned += 1;
            let path = format!("{dir}/{}", file.name);
            let Ok(content) = objects.read_text(&path).await else {
                continue;
            };
            if let Some(line) = content
                .lines()
                .find(|line| line.to_lowercase().contains(&needle))
            {
                hits.push(KnowledgeHit { path, line: line.trim().to_string() });
            }
        }
        if scanned >= MAX_FILES_SCANNED || hits.len() >= limit {
            break;
        }
    }

    debug!(scanned, matches = hits.len(), "knowledge search completed");
    let summary =
        format!("Found {} knowledge entries for \"{}\"", hits.len(), args.query);
    Ok(ToolResult::ok(json!({ "entries": hits }), summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_store::fs::LocalObjectStore;

    async fn seeded_store() -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects")).unwrap();
        store
            .write("knowledge/rust.md", "Rust is a systems language.", "text/markdown")
            .await
            .unwrap();
        store
            .write(
                "knowledge/deep/tokio.md",
                "Tokio is an async runtime for Rust.",
                "text/markdown",
            )
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn finds_matches_in_nested_directories() {
        let (_dir, store) = seeded_store().await;
        let args = QueryArgs { query: "rust".to_string(), limit: None };
        let result = execute(Some(&store), &args).await.unwrap();
        assert!(result.success);
        let entries = result.data["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn empty_tree_yields_zero_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects")).unwrap();
        let args = QueryArgs { query: "anything".to_string(), limit: None };
        let result = execute(Some(&store), &args).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data["entries"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn missing_storage_degrades_cleanly() {
        let args = QueryArgs { query: "q".to_string(), limit: None };
        let result = execute(None, &args).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ERR_STORAGE_NOT_AVAILABLE));
    }
}

//! `rag_search`: concurrent fan-out search across memory, knowledge files,
//! task artifacts, and task documents.
//!
//! The four sub-searches are independent reads with no ordering dependency,
//! so this is the one place a tool runs I/O in parallel. Each source that
//! is unavailable or fails contributes zero hits instead of failing the
//! whole search.

use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument};

use foreman_core::tools::ToolResult;
use foreman_store::{MemoryRecall, ObjectStore};

use crate::errors::ToolError;
use crate::knowledge;
use crate::request::QueryArgs;
use crate::traits::TaskPlanner;

const PER_SOURCE_LIMIT: usize = 5;

/// One merged hit, tagged with the source it came from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagHit {
    /// `memory`, `knowledge`, `artifacts`, or `tasks`.
    pub source: &'static str,
    /// Hit title or path.
    pub title: String,
    /// Matching content fragment.
    pub snippet: String,
}

/// Run `rag_search` across every configured source.
#[instrument(skip_all, fields(query = %args.query))]
pub async fn execute(
    recall: Option<&dyn MemoryRecall>,
    objects: Option<&dyn ObjectStore>,
    planner: &dyn TaskPlanner,
    args: &QueryArgs,
) -> Result<ToolResult, ToolError> {
    let limit = args.limit.unwrap_or(PER_SOURCE_LIMIT);

    let (memory_hits, knowledge_hits, artifact_hits, task_hits) = futures::join!(
        search_memory(recall, &args.query, limit),
        search_knowledge(objects, &args.query, limit),
        search_artifacts(objects, planner, &args.query, limit),
        search_tasks(planner, &args.query, limit),
    );

    let mut hits = Vec::new();
    hits.extend(memory_hits);
    hits.extend(knowledge_hits);
    hits.extend(artifact_hits);
    hits.extend(task_hits);

    let by_source = |source: &str| hits.iter().filter(|h| h.source == source).count();
    let summary = format!(
        "RAG search found {} hits ({} memory, {} knowledge, {} artifacts, {} tasks)",
        hits.len(),
        by_source("memory"),
        by_source("knowledge"),
        by_source("artifacts"),
        by_source("tasks"),
    );
    debug!(total = hits.len(), "rag fan-out completed");
    Ok(ToolResult::ok(json!({ "hits": hits }), summary))
}

async fn search_memory(
    recall: Option<&dyn MemoryRecall>,
    query: &str,
    limit: usize,
) -> Vec<RagHit> {
    let Some(recall) = recall else { return Vec::new() };
    match recall.search(query, limit).await {
        Ok(hits) => hits
            .into_iter()
            .map(|hit| RagHit {
                source: "memory",
                title: hit.source.unwrap_or_else(|| "memory".to_string()),
                snippet: hit.content,
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

async fn search_knowledge(
    objects: Option<&dyn ObjectStore>,
    query: &str,
    limit: usize,
) -> Vec<RagHit> {
    let args = QueryArgs { query: query.to_string(), limit: Some(limit) };
    let Ok(result) = knowledge::execute(objects, &args).await else {
        return Vec::new();
    };
    if !result.success {
        return Vec::new();
    }
    result.data["entries"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| RagHit {
                    source: "knowledge",
                    title: entry["path"].as_str().unwrap_or_default().to_string(),
                    snippet: entry["line"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Match artifact file names across all known tasks.
async fn search_artifacts(
    objects: Option<&dyn ObjectStore>,
    planner: &dyn TaskPlanner,
    query: &str,
    limit: usize,
) -> Vec<RagHit> {
    let Some(objects) = objects else { return Vec::new() };
    let Ok(tasks) = planner.list_tasks().await else { return Vec::new() };

    let needle = query.to_lowercase();
    let mut hits = Vec::new();
    for task in tasks {
        if hits.len() >= limit {
            break;
        }
        let dir = format!("tasks/{}/artifacts", task.task_id);
        let Ok(listing) = objects.read_dir(&dir).await else { continue };
        for file in listing.files {
            if hits.len() >= limit {
                break;
            }
            if file.name.to_lowercase().contains(&needle) {
                hits.push(RagHit {
                    source: "artifacts",
                    title: format!("{dir}/{}", file.name),
                    snippet: format!("artifact of task {}", task.task_id),
                });
            }
        }
    }
    hits
}

/// Match task titles, descriptions, and step titles.
async fn search_tasks(planner: &dyn TaskPlanner, query: &str, limit: usize) -> Vec<RagHit> {
    let Ok(tasks) = planner.list_tasks().await else { return Vec::new() };
    let needle = query.to_lowercase();
    tasks
        .into_iter()
        .filter(|task| {
            task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle)
                || task.steps.iter().any(|s| s.title.to_lowercase().contains(&needle))
        })
        .take(limit)
        .map(|task| RagHit {
            source: "tasks",
            title: task.title.clone(),
            snippet: format!("task {} ({})", task.task_id, task.status),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use foreman_core::tasks::{Task, TaskMetadata, TaskStatus};
    use foreman_store::MemoryHit;
    use foreman_store::fs::LocalObjectStore;
    use foreman_store::memory::StaticRecall;

    struct ListOnlyPlanner(Vec<Task>);

    #[async_trait]
    impl TaskPlanner for ListOnlyPlanner {
        async fn new_task(
            &self,
            _title: &str,
            _description: &str,
            _steps: Vec<foreman_core::tasks::StepDraft>,
        ) -> Result<Task, ToolError> {
            unimplemented!("not used in rag tests")
        }
        async fn load_task(&self, _task_id: &str) -> Result<Task, ToolError> {
            unimplemented!("not used in rag tests")
        }
        async fn update_task(&self, _update: crate::traits::TaskUpdate) -> Result<Task, ToolError> {
            unimplemented!("not used in rag tests")
        }
        async fn list_tasks(&self) -> Result<Vec<Task>, ToolError> {
            Ok(self.0.clone())
        }
    }

    fn task(id: &str, title: &str) -> Task {
        Task {
            task_id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Pending,
            steps: Vec::new(),
            metadata: TaskMetadata {
                created_at: "2026-08-29T00:00:00Z".to_string(),
                updated_at: "2026-08-29T00:00:00Z".to_string(),
                tags: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn merges_all_sources() {
        let dir = tempfile::tempdir().unwrap();
        let objects = LocalObjectStore::new(dir.path().join("objects")).unwrap();
        objects
            .write("knowledge/pricing.md", "pricing model overview", "text/markdown")
            .await
            .unwrap();
        objects
            .write("tasks/t-1/artifacts/pricing-report.md", "body", "text/markdown")
            .await
            .unwrap();

        let recall = StaticRecall::with_hits(vec![MemoryHit {
            content: "user asked about pricing tiers".to_string(),
            score: 0.8,
            source: None,
        }]);
        let planner = ListOnlyPlanner(vec![task("t-1", "Pricing research")]);

        let args = QueryArgs { query: "pricing".to_string(), limit: None };
        let result =
            execute(Some(&recall), Some(&objects), &planner, &args).await.unwrap();
        assert!(result.success);
        let hits = result.data["hits"].as_array().unwrap();
        let sources: Vec<&str> =
            hits.iter().map(|h| h["source"].as_str().unwrap()).collect();
        assert!(sources.contains(&"memory"));
        assert!(sources.contains(&"knowledge"));
        assert!(sources.contains(&"artifacts"));
        assert!(sources.contains(&"tasks"));
    }

    #[tokio::test]
    async fn absent_backends_contribute_zero_hits() {
        let planner = ListOnlyPlanner(Vec::new());
        let args = QueryArgs { query: "anything".to_string(), limit: None };
        let result = execute(None, None, &planner, &args).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data["hits"].as_array().unwrap().len(), 0);
    }
}

//! Task/step lifecycle service.
//!
//! Task documents live whole in the document store; every mutation is
//! load-full-document, mutate, write-full-document. The single-request-
//! per-session guarantee upstream makes that safe without locking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use foreman_core::tasks::{
    Step, StepStatus, Task, TaskMetadata, derive_task_id, normalize_steps,
    recompute_task_status, repair_task_document,
};
use foreman_store::{DocumentStore, ObjectStore};
use foreman_tools::{TaskPlanner, TaskUpdate, ToolError};

use crate::errors::TaskError;

/// Document collection holding task documents, keyed by task id.
pub const TASKS_COLLECTION: &str = "tasks";
/// Document collection holding write-once checkpoint snapshots.
pub const CHECKPOINTS_COLLECTION: &str = "task_checkpoints";

/// Task lifecycle operations over injected stores.
///
/// The object store is optional; without it the plan rendering is skipped
/// but the lifecycle still works.
pub struct TaskService {
    documents: Arc<dyn DocumentStore>,
    objects: Option<Arc<dyn ObjectStore>>,
}

impl TaskService {
    /// Build a service over the given stores.
    pub fn new(documents: Arc<dyn DocumentStore>, objects: Option<Arc<dyn ObjectStore>>) -> Self {
        Self { documents, objects }
    }

    /// Create and persist a new task.
    ///
    /// Steps are normalized: dense 1-based numbers, `pending` status and the
    /// general worker type where unspecified. Initial task status follows
    /// the recomputation rule (an empty plan is vacuously completed).
    #[instrument(skip_all, fields(title))]
    pub async fn new_task(
        &self,
        title: &str,
        description: &str,
        steps: Vec<foreman_core::tasks::StepDraft>,
    ) -> Result<Task, TaskError> {
        let now = Utc::now();
        let steps = normalize_steps(steps);
        let status = recompute_task_status(&steps);
        let task = Task {
            task_id: derive_task_id(title, now),
            title: title.to_string(),
            description: description.to_string(),
            status,
            steps,
            metadata: TaskMetadata {
                created_at: now.to_rfc3339(),
                updated_at: now.to_rfc3339(),
                tags: Vec::new(),
            },
        };
        self.persist(&task).await?;
        info!(task_id = %task.task_id, steps = task.steps.len(), "task created");
        Ok(task)
    }

    /// Load a task, auto-repairing legacy step records.
    ///
    /// Missing `number`/`status`/`workerType` fields are backfilled
    /// deterministically; a repair is persisted so the next load is clean.
    #[instrument(skip(self))]
    pub async fn load_task(&self, task_id: &str) -> Result<Task, TaskError> {
        let mut doc = self
            .documents
            .get(TASKS_COLLECTION, task_id)
            .await?
            .ok_or_else(|| TaskError::TaskNotFound { task_id: task_id.to_string() })?;

        let repaired = repair_task_document(&mut doc);
        let mut task: Task = serde_json::from_value(doc).map_err(|e| TaskError::Malformed {
            task_id: task_id.to_string(),
            message: e.to_string(),
        })?;

        let recomputed = recompute_task_status(&task.steps);
        let status_changed = recomputed != task.status;
        task.status = recomputed;

        if repaired || status_changed {
            warn!(task_id, repaired, status_changed, "task document repaired on load");
            self.persist(&task).await?;
        }
        Ok(task)
    }

    /// Apply a step mutation, recompute status, persist, and checkpoint.
    #[instrument(skip(self, update), fields(task_id = %update.task_id))]
    pub async fn update_task(&self, update: TaskUpdate) -> Result<Task, TaskError> {
        let mut task = self.load_task(&update.task_id).await?;
        let now = Utc::now().to_rfc3339();

        if let Some(step_number) = update.step_number {
            let step = task
                .steps
                .iter_mut()
                .find(|s| s.number == step_number)
                .ok_or(TaskError::StepNotFound {
                    task_id: update.task_id.clone(),
                    step_number,
                })?;
            apply_step_update(step, &update, &now);
        }

        task.status = recompute_task_status(&task.steps);
        task.metadata.updated_at = now.clone();
        self.persist(&task).await?;
        self.write_checkpoint(&task, update.step_number, &now).await?;
        debug!(status = %task.status, "task updated");
        Ok(task)
    }

    /// All tasks, most recently updated first. Documents that fail to parse
    /// are skipped rather than failing the listing.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, TaskError> {
        let docs = self.documents.list(TASKS_COLLECTION).await?;
        let mut tasks: Vec<Task> = docs
            .into_iter()
            .filter_map(|mut doc| {
                let _ = repair_task_document(&mut doc);
                serde_json::from_value(doc).ok()
            })
            .collect();
        tasks.sort_by(|a, b| b.metadata.updated_at.cmp(&a.metadata.updated_at));
        Ok(tasks)
    }

    async fn persist(&self, task: &Task) -> Result<(), TaskError> {
        let doc = serde_json::to_value(task).map_err(|e| TaskError::Malformed {
            task_id: task.task_id.clone(),
            message: e.to_string(),
        })?;
        self.documents.put(TASKS_COLLECTION, &task.task_id, &doc).await?;
        self.render_plan(task).await;
        Ok(())
    }

    /// Write-once audit snapshot. Never read back by this service.
    async fn write_checkpoint(
        &self,
        task: &Task,
        changed_step: Option<u32>,
        timestamp: &str,
    ) -> Result<(), TaskError> {
        let key = format!("{}-{}", task.task_id, timestamp);
        let snapshot = json!({
            "timestamp": timestamp,
            "task": task,
            "changedStep": changed_step,
        });
        self.documents.put(CHECKPOINTS_COLLECTION, &key, &snapshot).await?;
        Ok(())
    }

    /// Refresh the human-readable plan next to the task's artifacts. A
    /// render failure is logged, never propagated.
    async fn render_plan(&self, task: &Task) {
        let Some(objects) = &self.objects else { return };
        let path = format!("tasks/{}/plan.md", task.task_id);
        if let Err(e) = objects.write(&path, &plan_markdown(task), "text/markdown").await {
            warn!(task_id = %task.task_id, error = %e, "plan rendering failed");
        }
    }
}

fn apply_step_update(step: &mut Step, update: &TaskUpdate, now: &str) {
    if let Some(new_status) = update.step_status {
        if new_status == StepStatus::InProgress && step.started_at.is_none() {
            step.started_at = Some(now.to_string());
        }
        if new_status.is_terminal() && !step.status.is_terminal() {
            step.completed_at = Some(now.to_string());
        }
        step.status = new_status;
    }
    if let Some(output) = &update.step_output {
        // Notes accumulate; an update never erases earlier output.
        match &mut step.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(output);
            }
            None => step.notes = Some(output.clone()),
        }
    }
}

/// Markdown rendering of the plan: one checkbox line per step.
fn plan_markdown(task: &Task) -> String {
    let mut out = format!("# {}\n\n", task.title);
    if !task.description.is_empty() {
        out.push_str(&task.description);
        out.push_str("\n\n");
    }
    out.push_str(&format!("Status: {}\n\n", task.status));
    for step in &task.steps {
        let mark = match step.status {
            StepStatus::Completed => "x",
            StepStatus::Skipped => "-",
            _ => " ",
        };
        out.push_str(&format!(
            "- [{mark}] {}. {} ({})\n",
            step.number, step.title, step.worker_type
        ));
    }
    out
}

fn tool_err(e: TaskError) -> ToolError {
    match e {
        TaskError::TaskNotFound { task_id } => {
            ToolError::NotFound { message: format!("task {task_id}") }
        }
        TaskError::StepNotFound { task_id, step_number } => ToolError::NotFound {
            message: format!("step {step_number} of task {task_id}"),
        },
        other => ToolError::internal(other),
    }
}

#[async_trait]
impl TaskPlanner for TaskService {
    async fn new_task(
        &self,
        title: &str,
        description: &str,
        steps: Vec<foreman_core::tasks::StepDraft>,
    ) -> Result<Task, ToolError> {
        TaskService::new_task(self, title, description, steps).await.map_err(tool_err)
    }

    async fn load_task(&self, task_id: &str) -> Result<Task, ToolError> {
        TaskService::load_task(self, task_id).await.map_err(tool_err)
    }

    async fn update_task(&self, update: TaskUpdate) -> Result<Task, ToolError> {
        TaskService::update_task(self, update).await.map_err(tool_err)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, ToolError> {
        TaskService::list_tasks(self).await.map_err(tool_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use foreman_core::tasks::{StepDraft, TaskStatus};
    use foreman_store::memory::MemoryStore;

    fn service() -> (Arc<MemoryStore>, TaskService) {
        let store = Arc::new(MemoryStore::new());
        let service = TaskService::new(store.clone(), None);
        (store, service)
    }

    fn drafts(titles: &[&str]) -> Vec<StepDraft> {
        titles
            .iter()
            .map(|t| StepDraft { title: (*t).to_string(), ..Default::default() })
            .collect()
    }

    #[tokio::test]
    async fn new_task_numbers_steps_densely() {
        let (_store, service) = service();
        let task = service
            .new_task("Write report", "desc", drafts(&["Research", "Draft"]))
            .await
            .unwrap();
        assert_eq!(task.steps[0].number, 1);
        assert_eq!(task.steps[1].number, 2);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn empty_plan_is_vacuously_completed() {
        let (_store, service) = service();
        let task = service.new_task("Nothing to do", "", Vec::new()).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn completing_all_steps_completes_the_task() {
        let (_store, service) = service();
        let task =
            service.new_task("Report", "", drafts(&["Research", "Draft"])).await.unwrap();

        let task = service
            .update_task(TaskUpdate {
                task_id: task.task_id.clone(),
                step_number: Some(1),
                step_status: Some(StepStatus::Completed),
                step_output: None,
            })
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let task = service
            .update_task(TaskUpdate {
                task_id: task.task_id.clone(),
                step_number: Some(2),
                step_status: Some(StepStatus::Completed),
                step_output: None,
            })
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn timestamps_set_on_status_transitions() {
        let (_store, service) = service();
        let task = service.new_task("T", "", drafts(&["only"])).await.unwrap();

        let task = service
            .update_task(TaskUpdate {
                task_id: task.task_id.clone(),
                step_number: Some(1),
                step_status: Some(StepStatus::InProgress),
                step_output: None,
            })
            .await
            .unwrap();
        let started = task.steps[0].started_at.clone();
        assert!(started.is_some());
        assert!(task.steps[0].completed_at.is_none());

        let task = service
            .update_task(TaskUpdate {
                task_id: task.task_id.clone(),
                step_number: Some(1),
                step_status: Some(StepStatus::Completed),
                step_output: None,
            })
            .await
            .unwrap();
        // startedAt is first-transition-only, completedAt set on terminal.
        assert_eq!(task.steps[0].started_at, started);
        assert!(task.steps[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn step_output_appends_to_notes() {
        let (_store, service) = service();
        let task = service.new_task("T", "", drafts(&["only"])).await.unwrap();
        let update = |output: &str| TaskUpdate {
            task_id: task.task_id.clone(),
            step_number: Some(1),
            step_status: None,
            step_output: Some(output.to_string()),
        };
        let _ = service.update_task(update("first finding")).await.unwrap();
        let task = service.update_task(update("second finding")).await.unwrap();
        assert_eq!(task.steps[0].notes.as_deref(), Some("first finding\nsecond finding"));
    }

    #[tokio::test]
    async fn unknown_task_and_step_fail_cleanly() {
        let (_store, service) = service();
        assert_matches!(
            service.load_task("nope").await,
            Err(TaskError::TaskNotFound { .. })
        );

        let task = service.new_task("T", "", drafts(&["only"])).await.unwrap();
        assert_matches!(
            service
                .update_task(TaskUpdate {
                    task_id: task.task_id,
                    step_number: Some(9),
                    step_status: Some(StepStatus::Completed),
                    step_output: None,
                })
                .await,
            Err(TaskError::StepNotFound { step_number: 9, .. })
        );
    }

    #[tokio::test]
    async fn load_repairs_legacy_documents_once() {
        let (store, service) = service();
        // Legacy document: steps missing number, status, and workerType.
        let doc = json!({
            "taskId": "legacy-1",
            "title": "Old task",
            "status": "pending",
            "steps": [{"title": "a"}, {"title": "b"}],
            "metadata": {"createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-01T00:00:00Z"}
        });
        store.put(TASKS_COLLECTION, "legacy-1", &doc).await.unwrap();

        let task = service.load_task("legacy-1").await.unwrap();
        for (i, step) in task.steps.iter().enumerate() {
            assert_eq!(step.number, (i + 1) as u32);
            assert_eq!(step.status, StepStatus::Pending);
        }

        // The repair was persisted: the raw document now has the fields.
        let stored = store.get(TASKS_COLLECTION, "legacy-1").await.unwrap().unwrap();
        assert_eq!(stored["steps"][0]["number"], 1);
        assert_eq!(stored["steps"][1]["workerType"], "general");
    }

    #[tokio::test]
    async fn update_writes_a_checkpoint_snapshot() {
        let (store, service) = service();
        let task = service.new_task("T", "", drafts(&["only"])).await.unwrap();
        let _ = service
            .update_task(TaskUpdate {
                task_id: task.task_id.clone(),
                step_number: Some(1),
                step_status: Some(StepStatus::InProgress),
                step_output: None,
            })
            .await
            .unwrap();

        let checkpoints = store.list(CHECKPOINTS_COLLECTION).await.unwrap();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0]["changedStep"], 1);
        assert_eq!(checkpoints[0]["task"]["taskId"], task.task_id);
    }

    #[tokio::test]
    async fn list_tasks_sorts_by_update_time_descending() {
        let (_store, service) = service();
        let first = service.new_task("First", "", Vec::new()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let _second = service.new_task("Second", "", drafts(&["s"])).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let _ = service
            .update_task(TaskUpdate {
                task_id: first.task_id.clone(),
                step_number: None,
                step_status: None,
                step_output: None,
            })
            .await
            .unwrap();

        let tasks = service.list_tasks().await.unwrap();
        assert_eq!(tasks[0].title, "First");
        assert_eq!(tasks[1].title, "Second");
    }

    #[tokio::test]
    async fn plan_markdown_renders_checkboxes() {
        let dir = tempfile::tempdir().unwrap();
        let objects =
            Arc::new(foreman_store::fs::LocalObjectStore::new(dir.path().join("o")).unwrap());
        let store = Arc::new(MemoryStore::new());
        let service = TaskService::new(store, Some(objects.clone()));

        let task = service.new_task("Plan", "", drafts(&["Research"])).await.unwrap();
        let plan = objects
            .read_text(&format!("tasks/{}/plan.md", task.task_id))
            .await
            .unwrap();
        assert!(plan.contains("# Plan"));
        assert!(plan.contains("- [ ] 1. Research (general)"));
    }
}

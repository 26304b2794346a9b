//! Persisted plan documents: tasks, steps, and status recomputation.
//!
//! `Task.status` is a pure function of the step statuses and is recomputed
//! by [`recompute_task_status`] on every mutation path. The rule lives here,
//! exactly once — mutation sites must never reimplement it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::worker::WorkerType;

/// Status of a single plan step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started.
    #[default]
    Pending,
    /// Currently being worked on.
    InProgress,
    /// Done.
    Completed,
    /// Deliberately not executed.
    Skipped,
    /// Attempted and failed.
    Failed,
}

impl StepStatus {
    /// Whether this status is terminal (the step will not run again
    /// without an explicit retry).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }

    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived status of a whole task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No step has started.
    Pending,
    /// At least one step is running.
    InProgress,
    /// Every step is completed or skipped (or the plan is empty).
    Completed,
    /// A step failed before any step completed.
    Failed,
    /// A step failed after partial execution.
    Blocked,
}

impl TaskStatus {
    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bounded unit of delegated work within a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based position, dense and unique within the task.
    pub number: u32,
    /// Short step title.
    pub title: String,
    /// Which worker profile executes this step.
    pub worker_type: WorkerType,
    /// Current status.
    pub status: StepStatus,
    /// Whether the step requires explicit user approval before the next
    /// step proceeds.
    #[serde(default)]
    pub checkpoint: bool,
    /// What the step must achieve.
    #[serde(default)]
    pub objective: String,
    /// Inputs or constraints the step depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    /// Expected deliverables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    /// Accumulated execution notes. Appended to, never overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set on the first transition into `in_progress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// Set on the transition into any terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Task document metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-mutation timestamp.
    pub updated_at: String,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A persisted plan: a task and its ordered steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable id derived from creation time and a slug of the title.
    pub task_id: String,
    /// Task title.
    pub title: String,
    /// What the task is about.
    #[serde(default)]
    pub description: String,
    /// Derived status — always `recompute_task_status(&steps)`.
    pub status: TaskStatus,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Creation/update metadata.
    pub metadata: TaskMetadata,
}

/// Loosely-typed step input accepted by `new_task`.
///
/// Everything except the title is optional; [`normalize_steps`] fills in
/// deterministic defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDraft {
    /// Step title (required).
    pub title: String,
    /// Optional explicit position; ignored — positions are always assigned
    /// densely in input order.
    #[serde(default)]
    pub number: Option<u32>,
    /// Worker profile; defaults to `general`.
    #[serde(default)]
    pub worker_type: Option<WorkerType>,
    /// Initial status; defaults to `pending`.
    #[serde(default)]
    pub status: Option<StepStatus>,
    /// Checkpoint flag; defaults to false.
    #[serde(default)]
    pub checkpoint: Option<bool>,
    /// Step objective.
    #[serde(default)]
    pub objective: Option<String>,
    /// Requirements list.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Expected outputs list.
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// Recompute a task's status from its steps.
///
/// The rule, in precedence order:
/// - no steps → `Completed` (an empty plan is vacuously done)
/// - any failed step → `Blocked` if some other step already completed,
///   otherwise `Failed`
/// - any in-progress step → `InProgress`
/// - all steps completed or skipped → `Completed`
/// - otherwise → `Pending`
#[must_use]
pub fn recompute_task_status(steps: &[Step]) -> TaskStatus {
    if steps.is_empty() {
        return TaskStatus::Completed;
    }
    let any_failed = steps.iter().any(|s| s.status == StepStatus::Failed);
    if any_failed {
        let any_completed = steps.iter().any(|s| s.status == StepStatus::Completed);
        return if any_completed {
            TaskStatus::Blocked
        } else {
            TaskStatus::Failed
        };
    }
    if steps.iter().any(|s| s.status == StepStatus::InProgress) {
        return TaskStatus::InProgress;
    }
    if steps
        .iter()
        .all(|s| matches!(s.status, StepStatus::Completed | StepStatus::Skipped))
    {
        return TaskStatus::Completed;
    }
    TaskStatus::Pending
}

/// Normalize step drafts into well-formed steps: dense 1-based numbers in
/// input order, `pending` status, `general` worker, no checkpoint unless
/// requested.
#[must_use]
pub fn normalize_steps(drafts: Vec<StepDraft>) -> Vec<Step> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| Step {
            number: i as u32 + 1,
            title: d.title,
            worker_type: d.worker_type.unwrap_or_default(),
            status: d.status.unwrap_or_default(),
            checkpoint: d.checkpoint.unwrap_or(false),
            objective: d.objective.unwrap_or_default(),
            requirements: d.requirements,
            outputs: d.outputs,
            notes: None,
            started_at: None,
            completed_at: None,
        })
        .collect()
}

/// Back-fill missing `number`/`status`/`workerType` fields on a raw task
/// document loaded from storage.
///
/// Legacy documents predate the dense schema; the repair is deterministic:
/// `number` = 1-based position, `status` = `pending`, `workerType` =
/// `general`. Returns true when anything was changed so callers know to
/// persist the repaired document.
pub fn repair_task_document(doc: &mut Value) -> bool {
    let Some(steps) = doc.get_mut("steps").and_then(Value::as_array_mut) else {
        return false;
    };
    let mut repaired = false;
    for (i, step) in steps.iter_mut().enumerate() {
        let Some(obj) = step.as_object_mut() else {
            continue;
        };
        if obj.get("number").and_then(Value::as_u64).is_none() {
            let _ = obj.insert("number".into(), Value::from(i as u64 + 1));
            repaired = true;
        }
        if obj.get("status").and_then(Value::as_str).is_none() {
            let _ = obj.insert("status".into(), Value::from("pending"));
            repaired = true;
        }
        if obj.get("workerType").and_then(Value::as_str).is_none() {
            let _ = obj.insert("workerType".into(), Value::from("general"));
            repaired = true;
        }
    }
    repaired
}

/// Derive a stable task id from creation time and a slug of the title.
#[must_use]
pub fn derive_task_id(title: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", at.format("%Y%m%d-%H%M%S"), slugify(title))
}

/// Lowercase, alphanumeric-only slug with single-hyphen separators,
/// truncated to 40 characters.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
        if slug.len() >= 40 {
            break;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "task".to_string()
    } else {
        trimmed.to_string()
    }
}

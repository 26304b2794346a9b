//! Tool execution context and the delegate traits the runtime implements.
//!
//! Tools never talk to services directly; they go through these seams so
//! the registry can be exercised with scripted delegates in tests and so
//! the runtime stays free to wire real services at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use foreman_core::tasks::{StepDraft, StepStatus, Task};
use foreman_core::worker::{WorkerContext, WorkerResult};

use crate::errors::ToolError;

/// Execution context passed to every tool invocation.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Unique id of this tool call.
    pub tool_call_id: String,
    /// Session invoking the tool.
    pub session_id: String,
    /// Task the session is currently executing, if any.
    pub active_task_id: Option<String>,
    /// Cooperative cancellation.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// Context for a session with no active task.
    pub fn new(tool_call_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            session_id: session_id.into(),
            active_task_id: None,
            cancellation: CancellationToken::new(),
        }
    }
}

/// One web search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Result snippet.
    #[serde(default)]
    pub description: String,
}

/// Web search backend used by the `web_search` tool.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run a web search, returning up to `count` hits.
    async fn search(&self, query: &str, count: u32) -> Result<Vec<WebHit>, ToolError>;
}

/// A step mutation applied through [`TaskPlanner::update_task`].
#[derive(Clone, Debug, Default)]
pub struct TaskUpdate {
    /// Task to update.
    pub task_id: String,
    /// Step being mutated, if the update targets a step.
    pub step_number: Option<u32>,
    /// New step status.
    pub step_status: Option<StepStatus>,
    /// Output to append to the step's notes.
    pub step_output: Option<String>,
}

/// Task lifecycle operations behind the `planned_tasks` tool.
#[async_trait]
pub trait TaskPlanner: Send + Sync {
    /// Create and persist a new task from drafted steps.
    async fn new_task(
        &self,
        title: &str,
        description: &str,
        steps: Vec<StepDraft>,
    ) -> Result<Task, ToolError>;

    /// Load a task by id, repairing legacy step records if needed.
    async fn load_task(&self, task_id: &str) -> Result<Task, ToolError>;

    /// Apply a step mutation, recompute status, persist, checkpoint.
    async fn update_task(&self, update: TaskUpdate) -> Result<Task, ToolError>;

    /// All tasks, most recently updated first.
    async fn list_tasks(&self) -> Result<Vec<Task>, ToolError>;
}

/// Worker execution behind the `delegate_to_worker` tool.
#[async_trait]
pub trait WorkerRunner: Send + Sync {
    /// Run one stateless worker invocation to completion.
    async fn run(&self, context: WorkerContext) -> Result<WorkerResult, ToolError>;
}

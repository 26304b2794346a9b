//! The closed set of tool requests the registry can dispatch.
//!
//! Tool calls arrive from the reasoning backend as `(name, arguments)`
//! pairs. [`ToolRequest::parse`] turns them into one variant per tool with
//! typed arguments; names outside the set land in [`ToolRequest::Unknown`]
//! so dispatch stays exhaustive without ever panicking on new names.

use serde::Deserialize;
use serde_json::{Map, Value};

use foreman_core::messages::ToolCall;
use foreman_core::tasks::{StepDraft, StepStatus};
use foreman_core::worker::{Capability, WorkerType};

use crate::errors::ToolError;

/// Tool name for web search.
pub const WEB_SEARCH: &str = "web_search";
/// Tool name for memory recall.
pub const SEARCH_MEMORY: &str = "search_memory";
/// Tool name for knowledge-tree search.
pub const SEARCH_KNOWLEDGE: &str = "search_knowledge";
/// Tool name for fan-out RAG search.
pub const RAG_SEARCH: &str = "rag_search";
/// Tool name for task lifecycle operations.
pub const PLANNED_TASKS: &str = "planned_tasks";
/// Tool name for task-scoped artifact files.
pub const ARTIFACT_TOOL: &str = "artifact_tool";
/// Tool name for worker delegation.
pub const DELEGATE_TO_WORKER: &str = "delegate_to_worker";
/// Tool name for pausing the loop on a user question.
pub const ASK_USER: &str = "ask_user";

/// Arguments for `web_search`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchArgs {
    /// Search query.
    pub query: String,
    /// Max results to return.
    #[serde(default)]
    pub count: Option<u32>,
}

/// Arguments for `search_memory` and `search_knowledge`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    /// Search query.
    pub query: String,
    /// Max results to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Actions supported by `planned_tasks`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedTasksAction {
    /// Create a task from drafted steps.
    NewTask,
    /// Mutate a task or one of its steps.
    UpdateTask,
    /// Load a task by id.
    LoadTask,
    /// List all tasks.
    ListTasks,
}

/// Arguments for `planned_tasks`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTasksArgs {
    /// Which lifecycle operation to run.
    pub action: PlannedTasksAction,
    /// Task title (new_task).
    #[serde(default)]
    pub title: Option<String>,
    /// Task description (new_task).
    #[serde(default)]
    pub description: Option<String>,
    /// Drafted steps (new_task).
    #[serde(default)]
    pub steps: Vec<StepDraft>,
    /// Target task id (update_task, load_task).
    #[serde(default)]
    pub task_id: Option<String>,
    /// Step number to mutate (update_task).
    #[serde(default)]
    pub step_number: Option<u32>,
    /// New step status (update_task).
    #[serde(default)]
    pub step_status: Option<StepStatus>,
    /// Output appended to the step's notes (update_task).
    #[serde(default)]
    pub step_output: Option<String>,
}

/// Actions supported by `artifact_tool`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactAction {
    /// Write a file into the task's artifact collection.
    Write,
    /// Read a file back.
    Read,
    /// List the task's artifact files.
    List,
    /// Delete a file.
    Delete,
}

/// Arguments for `artifact_tool`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactArgs {
    /// Which file operation to run.
    pub action: ArtifactAction,
    /// Owning task.
    pub task_id: String,
    /// File name within the task's artifact collection.
    #[serde(default)]
    pub filename: Option<String>,
    /// File content (write).
    #[serde(default)]
    pub content: Option<String>,
    /// MIME type (write); defaults to markdown.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Arguments for `delegate_to_worker`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateArgs {
    /// Worker profile to run.
    pub worker_type: WorkerType,
    /// What the worker must achieve.
    pub objective: String,
    /// Longer step description.
    #[serde(default)]
    pub step_description: Option<String>,
    /// Constraints the worker must respect.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Prior-step outputs to hand the worker.
    #[serde(default)]
    pub previous_step_outputs: Vec<String>,
    /// Capabilities the sub-task needs, used for coverage validation.
    #[serde(default)]
    pub required_capabilities: Vec<Capability>,
    /// Turn budget override.
    #[serde(default)]
    pub max_turns: Option<u32>,
    /// Step number this delegation executes, if part of a task.
    #[serde(default)]
    pub step_number: Option<u32>,
}

/// Arguments for `ask_user`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskUserArgs {
    /// The question to put to the user.
    pub question: String,
    /// Optional answer options.
    #[serde(default)]
    pub options: Vec<String>,
    /// Optional context shown with the question.
    #[serde(default)]
    pub context: Option<String>,
}

/// One parsed tool request.
#[derive(Clone, Debug)]
pub enum ToolRequest {
    /// `web_search`.
    WebSearch(WebSearchArgs),
    /// `search_memory`.
    SearchMemory(QueryArgs),
    /// `search_knowledge`.
    SearchKnowledge(QueryArgs),
    /// `rag_search`.
    RagSearch(QueryArgs),
    /// `planned_tasks`.
    PlannedTasks(PlannedTasksArgs),
    /// `artifact_tool`.
    Artifact(ArtifactArgs),
    /// `delegate_to_worker`.
    Delegate(DelegateArgs),
    /// `ask_user`.
    AskUser(AskUserArgs),
    /// Any name outside the declared set. Dispatches to `TOOL_NOT_FOUND`.
    Unknown {
        /// The undeclared tool name.
        name: String,
        /// The arguments as received.
        arguments: Map<String, Value>,
    },
}

impl ToolRequest {
    /// Parse a tool call into a request.
    ///
    /// An unknown name is not an error — it parses to [`Self::Unknown`].
    /// Arguments that do not match a known tool's schema are an error, which
    /// the registry normalizes into an `EXECUTION_ERROR` result.
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let args = Value::Object(call.arguments.clone());
        let parsed = match call.name.as_str() {
            WEB_SEARCH => Self::WebSearch(serde_json::from_value(args)?),
            SEARCH_MEMORY => Self::SearchMemory(serde_json::from_value(args)?),
            SEARCH_KNOWLEDGE => Self::SearchKnowledge(serde_json::from_value(args)?),
            RAG_SEARCH => Self::RagSearch(serde_json::from_value(args)?),
            PLANNED_TASKS => Self::PlannedTasks(serde_json::from_value(args)?),
            ARTIFACT_TOOL => Self::Artifact(serde_json::from_value(args)?),
            DELEGATE_TO_WORKER => Self::Delegate(serde_json::from_value(args)?),
            ASK_USER => Self::AskUser(serde_json::from_value(args)?),
            _ => Self::Unknown {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        };
        Ok(parsed)
    }
}

//! Central dispatch: every tool call goes through [`ToolRegistry::execute`]
//! and comes back as a `ToolResult`, never as an error or a panic.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::json;
use tracing::{debug, instrument, warn};

use foreman_core::tools::{
    ERR_EXECUTION, ERR_TOOL_NOT_FOUND, META_DETAILS, ToolDefinition, ToolResult,
};
use foreman_core::messages::ToolCall;
use foreman_core::worker::WorkerType;
use foreman_store::{MemoryRecall, ObjectStore};

use crate::request::{
    ARTIFACT_TOOL, ASK_USER, DELEGATE_TO_WORKER, PLANNED_TASKS, RAG_SEARCH,
    SEARCH_KNOWLEDGE, SEARCH_MEMORY, ToolRequest, WEB_SEARCH,
};
use crate::schema::ToolSchemaBuilder;
use crate::traits::{SearchClient, TaskPlanner, ToolContext, WorkerRunner};
use crate::{artifact, ask_user, delegate, knowledge, memory, planner, rag, search};

/// The fixed tool surface, with its backends injected at construction.
///
/// Optional backends may be absent; the corresponding tools stay declared
/// and answer with a `*_NOT_AVAILABLE` failure.
pub struct ToolRegistry {
    search: Arc<dyn SearchClient>,
    planner: Arc<dyn TaskPlanner>,
    workers: Arc<dyn WorkerRunner>,
    memory: Option<Arc<dyn MemoryRecall>>,
    objects: Option<Arc<dyn ObjectStore>>,
}

impl ToolRegistry {
    /// Build a registry over the given backends.
    pub fn new(
        search: Arc<dyn SearchClient>,
        planner: Arc<dyn TaskPlanner>,
        workers: Arc<dyn WorkerRunner>,
        memory: Option<Arc<dyn MemoryRecall>>,
        objects: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self { search, planner, workers, memory, objects }
    }

    /// Declarations for the full tool surface, in a stable order.
    ///
    /// Every tool is always declared, including degraded ones — omitting a
    /// tool would make the reasoning backend hallucinate about availability.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let worker_types: Vec<&str> =
            WorkerType::all().iter().map(|wt| wt.as_str()).collect();
        vec![
            ToolSchemaBuilder::new(WEB_SEARCH, "Search the web for current information.")
                .required("query", json!({"type": "string", "description": "Search query"}))
                .prop("count", json!({"type": "integer", "description": "Max results (default 5)"}))
                .build(),
            ToolSchemaBuilder::new(
                SEARCH_MEMORY,
                "Recall facts from long-term memory relevant to a query.",
            )
            .required("query", json!({"type": "string"}))
            .prop("limit", json!({"type": "integer"}))
            .build(),
            ToolSchemaBuilder::new(
                SEARCH_KNOWLEDGE,
                "Search the curated knowledge files for a query.",
            )
            .required("query", json!({"type": "string"}))
            .prop("limit", json!({"type": "integer"}))
            .build(),
            ToolSchemaBuilder::new(
                RAG_SEARCH,
                "Search memory, knowledge files, task artifacts, and tasks at once.",
            )
            .required("query", json!({"type": "string"}))
            .prop("limit", json!({"type": "integer", "description": "Per-source hit limit"}))
            .build(),
            ToolSchemaBuilder::new(
                PLANNED_TASKS,
                "Create, update, load, or list multi-step task plans.",
            )
            .required(
                "action",
                json!({
                    "type": "string",
                    "enum": ["new_task", "update_task", "load_task", "list_tasks"]
                }),
            )
            .prop("title", json!({"type": "string", "description": "Task title (new_task)"}))
            .prop("description", json!({"type": "string"}))
            .prop(
                "steps",
                json!({
                    "type": "array",
                    "description": "Steps for new_task",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "workerType": {"type": "string", "enum": worker_types},
                            "objective": {"type": "string"},
                            "checkpoint": {"type": "boolean"}
                        },
                        "required": ["title"]
                    }
                }),
            )
            .prop("taskId", json!({"type": "string"}))
            .prop("stepNumber", json!({"type": "integer"}))
            .prop(
                "stepStatus",
                json!({
                    "type": "string",
                    "enum": ["pending", "in_progress", "completed", "skipped", "failed"]
                }),
            )
            .prop("stepOutput", json!({"type": "string"}))
            .build(),
            ToolSchemaBuilder::new(
                ARTIFACT_TOOL,
                "Write, read, list, or delete files in a task's artifact collection.",
            )
            .required(
                "action",
                json!({"type": "string", "enum": ["write", "read", "list", "delete"]}),
            )
            .required("taskId", json!({"type": "string"}))
            .prop("filename", json!({"type": "string"}))
            .prop("content", json!({"type": "string"}))
            .prop("mimeType", json!({"type": "string"}))
            .build(),
            ToolSchemaBuilder::new(
                DELEGATE_TO_WORKER,
                "Delegate a bounded sub-task to a specialized stateless worker.",
            )
            .required("workerType", json!({"type": "string", "enum": worker_types}))
            .required("objective", json!({"type": "string", "description": "What the worker must achieve"}))
            .prop("stepDescription", json!({"type": "string"}))
            .prop("constraints", json!({"type": "array", "items": {"type": "string"}}))
            .prop(
                "previousStepOutputs",
                json!({"type": "array", "items": {"type": "string"}}),
            )
            .prop(
                "requiredCapabilities",
                json!({
                    "type": "array",
                    "items": {
                        "type": "string",
                        "enum": ["search", "code_execution", "url_context"]
                    }
                }),
            )
            .prop("maxTurns", json!({"type": "integer"}))
            .prop("stepNumber", json!({"type": "integer"}))
            .build(),
            ToolSchemaBuilder::new(
                ASK_USER,
                "Ask the user a question and pause until they answer.",
            )
            .required("question", json!({"type": "string"}))
            .prop("options", json!({"type": "array", "items": {"type": "string"}}))
            .prop("context", json!({"type": "string"}))
            .build(),
        ]
    }

    /// Execute one tool call. Never errors outward; every failure mode is a
    /// failed `ToolResult`.
    #[instrument(skip_all, fields(tool = %call.name, call_id = %call.id))]
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let started = Instant::now();
        let result = self.dispatch(call, ctx).await;
        let elapsed_ms = duration_ceil_ms(started.elapsed());

        let outcome = if result.success { "ok" } else { "error" };
        counter!(
            "foreman_tool_executions_total",
            "tool" => call.name.clone(),
            "outcome" => outcome,
        )
        .increment(1);
        histogram!("foreman_tool_duration_ms", "tool" => call.name.clone())
            .record(elapsed_ms as f64);
        debug!(elapsed_ms, success = result.success, "tool executed");
        result
    }

    async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let request = match ToolRequest::parse(call) {
            Ok(request) => request,
            Err(err) => return execution_error(&call.name, &err),
        };

        let outcome = match &request {
            ToolRequest::WebSearch(args) => search::execute(self.search.as_ref(), args).await,
            ToolRequest::SearchMemory(args) => {
                memory::execute(self.memory.as_deref(), args).await
            }
            ToolRequest::SearchKnowledge(args) => {
                knowledge::execute(self.objects.as_deref(), args).await
            }
            ToolRequest::RagSearch(args) => {
                rag::execute(
                    self.memory.as_deref(),
                    self.objects.as_deref(),
                    self.planner.as_ref(),
                    args,
                )
                .await
            }
            ToolRequest::PlannedTasks(args) => {
                planner::execute(self.planner.as_ref(), args).await
            }
            ToolRequest::Artifact(args) => {
                artifact::execute(self.objects.as_deref(), args).await
            }
            ToolRequest::Delegate(args) => {
                delegate::execute(self.workers.as_ref(), ctx, args).await
            }
            ToolRequest::AskUser(args) => ask_user::execute(args),
            ToolRequest::Unknown { name, .. } => {
                warn!(tool = %name, "call to undeclared tool");
                return ToolResult::failure(
                    ERR_TOOL_NOT_FOUND,
                    format!("No tool named \"{name}\" is registered"),
                );
            }
        };

        match outcome {
            Ok(result) => result,
            Err(err) => execution_error(&call.name, &err),
        }
    }

    /// Whether the loop must pause for the user after this result.
    pub fn is_user_input_required(name: &str, result: &ToolResult) -> bool {
        name == ASK_USER || result.requires_user_input()
    }
}

fn execution_error(tool: &str, err: &crate::errors::ToolError) -> ToolResult {
    warn!(tool, %err, "tool execution failed");
    ToolResult::failure(ERR_EXECUTION, format!("{tool} failed"))
        .with_metadata(META_DETAILS, json!(err.to_string()))
}

/// Elapsed wall time in whole milliseconds, rounding sub-millisecond calls
/// up to 1 so they stay visible in histograms.
fn duration_ceil_ms(elapsed: std::time::Duration) -> u64 {
    (elapsed.as_millis() as u64).max(1)
}

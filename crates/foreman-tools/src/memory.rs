//! `search_memory` tool over the optional recall backend.

use serde_json::json;

use foreman_core::tools::{ERR_MEMORY_NOT_AVAILABLE, ToolResult};
use foreman_store::MemoryRecall;

use crate::errors::ToolError;
use crate::request::QueryArgs;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 20;

/// Run `search_memory`. A missing backend is a degraded result, not an
/// error — the tool stays declared either way.
pub async fn execute(
    recall: Option<&dyn MemoryRecall>,
    args: &QueryArgs,
) -> Result<ToolResult, ToolError> {
    let Some(recall) = recall else {
        return Ok(ToolResult::failure(
            ERR_MEMORY_NOT_AVAILABLE,
            "Memory search is not available in this deployment",
        ));
    };

    let limit = args.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let hits = recall.search(&args.query, limit).await?;
    let summary = format!("Recalled {} memories for \"{}\"", hits.len(), args.query);
    Ok(ToolResult::ok(json!({ "memories": hits }), summary))
}

//! `artifact_tool`: write/read/list/delete of task-scoped files.
//!
//! Artifacts live under `tasks/<taskId>/artifacts/` in object storage.
//! Writes with an existing name overwrite — an overwrite is just a new
//! write with the same id.

use serde_json::json;

use foreman_core::tools::{ERR_STORAGE_NOT_AVAILABLE, ToolResult};
use foreman_store::ObjectStore;

use crate::errors::ToolError;
use crate::request::{ArtifactAction, ArtifactArgs};

fn artifact_dir(task_id: &str) -> String {
    format!("tasks/{task_id}/artifacts")
}

fn require_filename(args: &ArtifactArgs) -> Result<&str, ToolError> {
    let filename = args
        .filename
        .as_deref()
        .ok_or_else(|| ToolError::invalid("filename is required for this action"))?;
    if filename.is_empty() || filename.contains('/') || filename.contains("..") {
        return Err(ToolError::invalid(format!("illegal artifact filename: {filename}")));
    }
    Ok(filename)
}

/// Run one `artifact_tool` action.
pub async fn execute(
    objects: Option<&dyn ObjectStore>,
    args: &ArtifactArgs,
) -> Result<ToolResult, ToolError> {
    let Some(objects) = objects else {
        return Ok(ToolResult::failure(
            ERR_STORAGE_NOT_AVAILABLE,
            "Artifact storage is not configured",
        ));
    };
    if args.task_id.is_empty() {
        return Err(ToolError::invalid("taskId must not be empty"));
    }
    let dir = artifact_dir(&args.task_id);

    match args.action {
        ArtifactAction::Write => {
            let filename = require_filename(args)?;
            let content = args
                .content
                .as_deref()
                .ok_or_else(|| ToolError::invalid("content is required for write"))?;
            let mime = args.mime_type.as_deref().unwrap_or("text/markdown");
            objects.write(&format!("{dir}/{filename}"), content, mime).await?;
            Ok(ToolResult::ok(
                json!({ "path": format!("{dir}/{filename}"), "bytes": content.len() }),
                format!("Wrote artifact {filename}"),
            ))
        }
        ArtifactAction::Read => {
            let filename = require_filename(args)?;
            let content = objects.read_text(&format!("{dir}/{filename}")).await?;
            Ok(ToolResult::ok(
                json!({ "filename": filename, "content": content }),
                format!("Read artifact {filename}"),
            ))
        }
        ArtifactAction::List => {
            let listing = match objects.read_dir(&dir).await {
                Ok(listing) => listing,
                // No artifacts written yet.
                Err(foreman_store::StoreError::NotFound(_)) => Default::default(),
                Err(e) => return Err(e.into()),
            };
            let count = listing.files.len();
            Ok(ToolResult::ok(
                json!({ "files": listing.files }),
                format!("Task {} has {count} artifacts", args.task_id),
            ))
        }
        ArtifactAction::Delete => {
            let filename = require_filename(args)?;
            objects.delete(&format!("{dir}/{filename}")).await?;
            Ok(ToolResult::ok(
                json!({ "deleted": filename }),
                format!("Deleted artifact {filename}"),
            ))
        }
    }
}

//! `ask_user`: terminal, non-delegating. Its result tells the loop to stop
//! and surface the question.

use serde_json::json;

use foreman_core::tools::{META_REQUIRES_USER_INPUT, ToolResult};

use crate::errors::ToolError;
use crate::request::AskUserArgs;

/// Run `ask_user`. Always succeeds; the pause is signalled via metadata.
pub fn execute(args: &AskUserArgs) -> Result<ToolResult, ToolError> {
    if args.question.trim().is_empty() {
        return Err(ToolError::invalid("question must not be empty"));
    }

    let mut summary = String::new();
    if let Some(context) = &args.context {
        summary.push_str(context);
        summary.push_str("\n\n");
    }
    summary.push_str(&args.question);
    if !args.options.is_empty() {
        summary.push('\n');
        for (i, option) in args.options.iter().enumerate() {
            summary.push_str(&format!("\n{}. {option}", i + 1));
        }
    }

    Ok(ToolResult::ok(
        json!({
            "question": args.question,
            "options": args.options,
            "context": args.context,
        }),
        summary,
    )
    .with_metadata(META_REQUIRES_USER_INPUT, json!(true)))
}

//! `delegate_to_worker`: capability-coverage validation plus one stateless
//! worker invocation.

use serde_json::json;
use tracing::{info, instrument};

use foreman_core::tools::ToolResult;
use foreman_core::worker::{
    COVERAGE_ACCEPTABLE, DEFAULT_WORKER_TURNS, WorkerContext, WorkerType,
    assignment_coverage,
};

use crate::errors::ToolError;
use crate::request::DelegateArgs;
use crate::traits::{ToolContext, WorkerRunner};

/// Metadata key carrying the computed assignment coverage.
pub const META_COVERAGE: &str = "coverage";
/// Error code for an assignment below the coverage threshold.
pub const ERR_LOW_COVERAGE: &str = "LOW_COVERAGE";

/// Run `delegate_to_worker`.
///
/// The assignment is validated first: `covered / required * 100` must be at
/// least the acceptable threshold, otherwise the call fails with the best
/// matching worker suggested and no delegation happens.
#[instrument(skip_all, fields(worker = %args.worker_type))]
pub async fn execute(
    runner: &dyn WorkerRunner,
    ctx: &ToolContext,
    args: &DelegateArgs,
) -> Result<ToolResult, ToolError> {
    let coverage = assignment_coverage(&args.required_capabilities, args.worker_type);
    if coverage < COVERAGE_ACCEPTABLE {
        let best = best_match(args);
        return Ok(ToolResult::failure(
            ERR_LOW_COVERAGE,
            format!(
                "{} covers only {coverage}% of the required capabilities; consider {best}",
                args.worker_type
            ),
        )
        .with_metadata(META_COVERAGE, json!(coverage)));
    }

    let context = WorkerContext {
        worker_type: args.worker_type,
        objective: args.objective.clone(),
        step_description: args.step_description.clone().unwrap_or_default(),
        constraints: args.constraints.clone(),
        previous_step_outputs: args.previous_step_outputs.clone(),
        max_turns: args.max_turns.unwrap_or(DEFAULT_WORKER_TURNS),
        task_id: ctx.active_task_id.clone(),
        step_number: args.step_number,
    };

    info!(objective = %context.objective, turns = context.max_turns, "delegating to worker");
    let result = runner.run(context).await?;

    let summary = if result.success {
        format!(
            "{} finished in {} turns with {} artifacts",
            args.worker_type,
            result.metadata.turns_used,
            result.artifacts.len()
        )
    } else {
        format!(
            "{} failed after {} turns: {}",
            args.worker_type,
            result.metadata.turns_used,
            foreman_core::text::first_line(&result.output)
        )
    };

    let success = result.success;
    let data = serde_json::to_value(&result)?;
    let tool_result = ToolResult { success, data, summary, metadata: Default::default() }
        .with_metadata(META_COVERAGE, json!(coverage));
    Ok(tool_result)
}

/// The worker type with the highest coverage for the requested capabilities.
fn best_match(args: &DelegateArgs) -> WorkerType {
    WorkerType::all()
        .iter()
        .copied()
        .max_by_key(|wt| assignment_coverage(&args.required_capabilities, *wt))
        .unwrap_or(WorkerType::General)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use foreman_core::worker::{Capability, WorkerResult, WorkerResultMetadata};

    struct FixedRunner {
        result: WorkerResult,
    }

    #[async_trait]
    impl WorkerRunner for FixedRunner {
        async fn run(&self, context: WorkerContext) -> Result<WorkerResult, ToolError> {
            assert_eq!(context.max_turns, DEFAULT_WORKER_TURNS);
            Ok(self.result.clone())
        }
    }

    fn delegate_args(worker_type: WorkerType, required: Vec<Capability>) -> DelegateArgs {
        DelegateArgs {
            worker_type,
            objective: "summarize findings".to_string(),
            step_description: None,
            constraints: Vec::new(),
            previous_step_outputs: Vec::new(),
            required_capabilities: required,
            max_turns: None,
            step_number: None,
        }
    }

    fn success_result() -> WorkerResult {
        WorkerResult {
            success: true,
            output: "done".to_string(),
            artifacts: Vec::new(),
            observations: Vec::new(),
            metadata: WorkerResultMetadata { turns_used: 2, ..Default::default() },
        }
    }

    #[tokio::test]
    async fn acceptable_coverage_delegates() {
        let runner = FixedRunner { result: success_result() };
        let ctx = ToolContext::new("call-1", "session-1");
        let args = delegate_args(WorkerType::General, vec![Capability::Search]);
        let result = execute(&runner, &ctx, &args).await.unwrap();
        assert!(result.success);
        assert_eq!(result.metadata[META_COVERAGE], 100);
        assert_eq!(result.data["metadata"]["turnsUsed"], 2);
    }

    #[tokio::test]
    async fn low_coverage_is_rejected_without_delegating() {
        struct PanicRunner;
        #[async_trait]
        impl WorkerRunner for PanicRunner {
            async fn run(&self, _context: WorkerContext) -> Result<WorkerResult, ToolError> {
                panic!("must not be called");
            }
        }

        let ctx = ToolContext::new("call-1", "session-1");
        // Writer has no native tools: 0% coverage of a search requirement.
        let args = delegate_args(WorkerType::Writer, vec![Capability::Search]);
        let result = execute(&PanicRunner, &ctx, &args).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ERR_LOW_COVERAGE));
        assert_eq!(result.metadata[META_COVERAGE], 0);
    }

    #[tokio::test]
    async fn worker_failure_surfaces_as_failed_result() {
        let runner = FixedRunner {
            result: WorkerResult {
                success: false,
                output: "backend unavailable\nmore detail".to_string(),
                artifacts: Vec::new(),
                observations: Vec::new(),
                metadata: WorkerResultMetadata { turns_used: 1, ..Default::default() },
            },
        };
        let ctx = ToolContext::new("call-1", "session-1");
        let args = delegate_args(WorkerType::Coder, vec![Capability::CodeExecution]);
        let result = execute(&runner, &ctx, &args).await.unwrap();
        assert!(!result.success);
        assert!(result.summary.contains("backend unavailable"));
    }

    #[tokio::test]
    async fn active_task_id_flows_into_worker_context() {
        struct AssertRunner;
        #[async_trait]
        impl WorkerRunner for AssertRunner {
            async fn run(&self, context: WorkerContext) -> Result<WorkerResult, ToolError> {
                assert_eq!(context.task_id.as_deref(), Some("t-42"));
                Ok(WorkerResult {
                    success: true,
                    output: String::new(),
                    artifacts: Vec::new(),
                    observations: Vec::new(),
                    metadata: WorkerResultMetadata::default(),
                })
            }
        }

        let mut ctx = ToolContext::new("call-1", "session-1");
        ctx.active_task_id = Some("t-42".to_string());
        let args = delegate_args(WorkerType::General, Vec::new());
        let result = execute(&AssertRunner, &ctx, &args).await.unwrap();
        assert!(result.success);
    }
}

//! Stateless worker executor.
//!
//! Each invocation builds a fresh message sequence from the
//! [`WorkerContext`], runs a private turn loop against the reasoning
//! backend with only the profile's native tools enabled, and returns a
//! [`WorkerResult`]. Nothing is retained between invocations — the admin
//! owns cross-step memory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use foreman_core::artifacts::extract_code_artifacts;
use foreman_core::messages::{ChatMessage, TokenUsage};
use foreman_core::worker::{WorkerContext, WorkerResult, WorkerResultMetadata};
use foreman_llm::{GenerateOptions, GenerateRequest, ReasoningBackend};
use foreman_tools::{ToolError, WorkerRunner};

use crate::prompt;

/// Fallback completion phrases accepted in addition to the exact sentinel.
const FALLBACK_PHRASES: [&str; 2] = ["task complete", "deliverable ready"];

/// Runs worker invocations against a reasoning backend.
pub struct WorkerExecutor {
    backend: Arc<dyn ReasoningBackend>,
}

impl WorkerExecutor {
    /// Build an executor over the given backend.
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { backend }
    }

    #[instrument(skip_all, fields(worker = %context.worker_type, max_turns = context.max_turns))]
    async fn run_loop(&self, context: WorkerContext) -> WorkerResult {
        let profile = context.worker_type.profile();
        let system = prompt::worker_system(context.worker_type);
        let mut messages = vec![ChatMessage::user(prompt::worker_user(&context))];

        let mut usage = TokenUsage::default();
        let mut metadata = WorkerResultMetadata::default();
        let mut artifacts = Vec::new();
        let mut observations = Vec::new();
        let mut last_output = String::new();

        for turn in 1..=context.max_turns {
            let request = GenerateRequest {
                messages: messages.clone(),
                system: system.clone(),
                options: GenerateOptions {
                    tools: Vec::new(),
                    temperature: Some(profile.temperature),
                    max_output_tokens: Some(profile.max_output_tokens),
                    thinking_budget: None,
                    use_search: profile.search,
                    use_code_execution: profile.code_execution,
                    use_url_context: profile.url_context,
                },
            };

            let response = match self.backend.generate(&request).await {
                Ok(response) => response,
                Err(e) => {
                    // No automatic retry: the admin decides whether to
                    // re-delegate.
                    warn!(turn, error = %e, "worker turn failed");
                    metadata.tokens_consumed = usage.total();
                    metadata.thinking_tokens = usage.thinking_tokens;
                    return WorkerResult {
                        success: false,
                        output: format!("worker failed on turn {turn}: {e}"),
                        artifacts,
                        observations,
                        metadata,
                    };
                }
            };

            metadata.turns_used = turn;
            usage.add(&response.usage);
            if !response.search_results.is_empty() {
                let _ = metadata.tools_used.insert("search".to_string());
                for result in &response.search_results {
                    observations.push(format!("source: {} ({})", result.title, result.url));
                }
            }
            if !response.code_execution_results.is_empty() {
                let _ = metadata.tools_used.insert("code_execution".to_string());
            }

            artifacts.extend(extract_code_artifacts(&response.text));
            last_output = response.text.clone();

            if let Some(output) = completed_output(&response.text) {
                debug!(turn, "worker emitted completion sentinel");
                metadata.tokens_consumed = usage.total();
                metadata.thinking_tokens = usage.thinking_tokens;
                return WorkerResult {
                    success: true,
                    output,
                    artifacts,
                    observations,
                    metadata,
                };
            }

            messages.push(ChatMessage::assistant(response.text));
            messages.push(ChatMessage::user(prompt::worker_continuation(
                context.max_turns - turn,
            )));
        }

        // Exhaustion is best-effort delivery, not failure: turn budgets are
        // soft limits for workers.
        debug!("worker exhausted turn budget");
        metadata.tokens_consumed = usage.total();
        metadata.thinking_tokens = usage.thinking_tokens;
        WorkerResult {
            success: true,
            output: strip_sentinel(&last_output),
            artifacts,
            observations,
            metadata,
        }
    }
}

/// If the text signals completion, the output with the sentinel stripped.
fn completed_output(text: &str) -> Option<String> {
    if text.contains(prompt::COMPLETION_SENTINEL) {
        return Some(strip_sentinel(text));
    }
    let lower = text.to_lowercase();
    if FALLBACK_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return Some(text.trim().to_string());
    }
    None
}

fn strip_sentinel(text: &str) -> String {
    text.replace(prompt::COMPLETION_SENTINEL, "").trim().to_string()
}

#[async_trait]
impl WorkerRunner for WorkerExecutor {
    async fn run(&self, context: WorkerContext) -> Result<WorkerResult, ToolError> {
        Ok(self.run_loop(context).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_core::worker::WorkerType;
    use foreman_llm::GenerateResponse;
    use foreman_llm::scripted::ScriptedBackend;

    fn context(worker_type: WorkerType, max_turns: u32) -> WorkerContext {
        WorkerContext {
            worker_type,
            objective: "produce the deliverable".to_string(),
            step_description: String::new(),
            constraints: Vec::new(),
            previous_step_outputs: Vec::new(),
            max_turns,
            task_id: None,
            step_number: None,
        }
    }

    #[tokio::test]
    async fn stops_on_exact_sentinel() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            GenerateResponse::text("still working"),
            GenerateResponse::text("Here is the report. <<TASK_COMPLETE>>"),
        ]));
        let executor = WorkerExecutor::new(backend.clone());
        let result = executor.run_loop(context(WorkerType::Writer, 5)).await;

        assert!(result.success);
        assert_eq!(result.metadata.turns_used, 2);
        assert_eq!(result.output, "Here is the report.");
        assert_eq!(backend.served(), 2);
    }

    #[tokio::test]
    async fn fallback_phrase_counts_as_completion() {
        let backend = Arc::new(ScriptedBackend::new(vec![GenerateResponse::text(
            "The task complete — see above.",
        )]));
        let executor = WorkerExecutor::new(backend);
        let result = executor.run_loop(context(WorkerType::Writer, 5)).await;
        assert!(result.success);
        assert_eq!(result.metadata.turns_used, 1);
    }

    #[tokio::test]
    async fn exhaustion_is_best_effort_success() {
        let backend = Arc::new(ScriptedBackend::new(vec![GenerateResponse::text(
            "partial progress only",
        )]));
        let executor = WorkerExecutor::new(backend);
        let result = executor.run_loop(context(WorkerType::Writer, 1)).await;

        assert!(result.success);
        assert_eq!(result.metadata.turns_used, 1);
        assert_eq!(result.output, "partial progress only");
    }

    #[tokio::test]
    async fn mid_loop_error_fails_with_partial_state() {
        // Script one good turn; the second call hits script exhaustion,
        // which stands in for a backend failure.
        let backend = Arc::new(ScriptedBackend::new(vec![GenerateResponse::text(
            "```python\nprint('hi')\n```\nstill going",
        )]));
        let executor = WorkerExecutor::new(backend);
        let result = executor.run_loop(context(WorkerType::Coder, 3)).await;

        assert!(!result.success);
        assert_eq!(result.metadata.turns_used, 1);
        // The artifact extracted before the failure is kept.
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.artifacts[0].artifact_type, "python");
        assert!(result.output.contains("turn 2"));
    }

    #[tokio::test]
    async fn native_tool_usage_is_recorded() {
        let mut response = GenerateResponse::text("Findings attached. <<TASK_COMPLETE>>");
        response.search_results.push(foreman_llm::SearchResult {
            title: "Doc".to_string(),
            url: "https://example.com".to_string(),
            snippet: String::new(),
        });
        response.usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 20,
            thinking_tokens: 5,
        };
        let backend = Arc::new(ScriptedBackend::new(vec![response]));
        let executor = WorkerExecutor::new(backend);
        let result = executor.run_loop(context(WorkerType::Researcher, 5)).await;

        assert!(result.metadata.tools_used.contains("search"));
        assert_eq!(result.metadata.tokens_consumed, 125);
        assert_eq!(result.metadata.thinking_tokens, 5);
        assert_eq!(result.observations, vec!["source: Doc (https://example.com)"]);
    }

    #[tokio::test]
    async fn fresh_messages_each_invocation() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            GenerateResponse::text("one <<TASK_COMPLETE>>"),
            GenerateResponse::text("two <<TASK_COMPLETE>>"),
        ]));
        let executor = WorkerExecutor::new(backend.clone());
        let _ = executor.run_loop(context(WorkerType::Writer, 5)).await;
        let _ = executor.run_loop(context(WorkerType::Writer, 5)).await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        // The second invocation starts from scratch: one user message.
        assert_eq!(requests[1].messages.len(), 1);
    }
}

//! Backend request/response types and the [`ReasoningBackend`] trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use foreman_core::messages::{ChatMessage, TokenUsage, ToolCall};
use foreman_core::tools::ToolDefinition;

use crate::errors::BackendError;

/// Generation knobs carried alongside the message history.
#[derive(Clone, Debug, Default)]
pub struct GenerateOptions {
    /// Function declarations offered to the model.
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    /// Max output tokens override.
    pub max_output_tokens: Option<u32>,
    /// Thinking budget in tokens, if the model supports it.
    pub thinking_budget: Option<u32>,
    /// Enable the backend's native web-search tool.
    pub use_search: bool,
    /// Enable the backend's native code-execution tool.
    pub use_code_execution: bool,
    /// Enable the backend's native URL-context tool.
    pub use_url_context: bool,
}

/// One request to a reasoning backend.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// System instruction.
    pub system: String,
    /// Generation options.
    pub options: GenerateOptions,
}

/// A grounded search result surfaced by a native search tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Snippet, when available.
    #[serde(default)]
    pub snippet: String,
}

/// What a backend produced for one request.
#[derive(Clone, Debug, Default)]
pub struct GenerateResponse {
    /// Assistant text (may be empty when only tool calls were produced).
    pub text: String,
    /// Function calls requested by the model.
    pub tool_calls: Vec<ToolCall>,
    /// Token accounting for this exchange.
    pub usage: TokenUsage,
    /// Grounded search results, when native search ran.
    pub search_results: Vec<SearchResult>,
    /// Stdout/stderr fragments from native code execution.
    pub code_execution_results: Vec<String>,
}

impl GenerateResponse {
    /// A plain-text response with no tool calls.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }
}

/// The single seam between the orchestration loop and a model API.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Model identifier used for this backend.
    fn model(&self) -> &str;

    /// Produce one model turn for the given request.
    async fn generate(&self, request: &GenerateRequest)
    -> Result<GenerateResponse, BackendError>;
}

//! Google Gemini backend over the `generateContent` REST endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use async_trait::async_trait;
use foreman_core::messages::{ChatMessage, Role, TokenUsage, ToolCall};
use foreman_core::ids::new_call_id;

use crate::errors::BackendError;
use crate::types::{GenerateRequest, GenerateResponse, ReasoningBackend, SearchResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for [`GeminiBackend`].
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// Model identifier, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Default sampling temperature.
    pub temperature: f32,
    /// Default max output tokens.
    pub max_output_tokens: u32,
}

/// [`ReasoningBackend`] backed by the Gemini API.
pub struct GeminiBackend {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiBackend {
    /// Build a backend with a dedicated HTTP client.
    pub fn new(config: GeminiConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    fn build_body(&self, request: &GenerateRequest) -> Value {
        let contents: Vec<Value> = request.messages.iter().map(to_content).collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request.options.temperature.unwrap_or(self.config.temperature),
                "maxOutputTokens": request
                    .options
                    .max_output_tokens
                    .unwrap_or(self.config.max_output_tokens),
            },
        });

        if !request.system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": request.system }] });
        }
        if let Some(budget) = request.options.thinking_budget {
            body["generationConfig"]["thinkingConfig"] = json!({ "thinkingBudget": budget });
        }

        // Function declarations and native tools go into the same `tools`
        // array; the API rejects requests that mix them, so callers enable
        // one kind or the other per request.
        let mut tools: Vec<Value> = Vec::new();
        if !request.options.tools.is_empty() {
            let declarations: Vec<Value> = request
                .options
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            tools.push(json!({ "functionDeclarations": declarations }));
        }
        if request.options.use_search {
            tools.push(json!({ "googleSearch": {} }));
        }
        if request.options.use_code_execution {
            tools.push(json!({ "codeExecution": {} }));
        }
        if request.options.use_url_context {
            tools.push(json!({ "urlContext": {} }));
        }
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
        }

        body
    }
}

#[async_trait]
impl ReasoningBackend for GeminiBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        let body = self.build_body(request);
        debug!(messages = request.messages.len(), "sending generateContent request");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gemini request failed");
            return Err(BackendError::Api { status: status.as_u16(), message });
        }

        let wire: WireResponse = response.json().await?;
        parse_response(wire)
    }
}

/// Map a chat message into Gemini `contents` format. Tool results travel
/// back as `functionResponse` parts under the `user` role.
fn to_content(message: &ChatMessage) -> Value {
    match message.role {
        Role::User => {
            let mut parts = vec![json!({ "text": message.content })];
            for image in &message.images {
                parts.push(json!({
                    "inlineData": { "mimeType": "image/png", "data": image }
                }));
            }
            json!({ "role": "user", "parts": parts })
        }
        Role::Assistant => {
            json!({ "role": "model", "parts": [{ "text": message.content }] })
        }
        Role::Tool => json!({
            "role": "user",
            "parts": [{
                "functionResponse": {
                    "name": "tool",
                    "response": { "content": message.content },
                }
            }]
        }),
    }
}

fn parse_response(wire: WireResponse) -> Result<GenerateResponse, BackendError> {
    let Some(candidate) = wire.candidates.into_iter().next() else {
        return Err(BackendError::EmptyResponse { reason: "no candidates".to_string() });
    };

    if let Some(reason) = &candidate.finish_reason
        && is_abnormal_finish(reason)
        && candidate.content.is_none()
    {
        return Err(BackendError::EmptyResponse { reason: reason.clone() });
    }

    let mut out = GenerateResponse::default();
    let mut texts: Vec<String> = Vec::new();

    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if part.thought == Some(true) {
            continue;
        }
        if let Some(text) = part.text {
            texts.push(text);
        }
        if let Some(call) = part.function_call {
            let arguments = match call.args {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                other => {
                    // Non-object args are rare but observed; wrap them.
                    let mut map = Map::new();
                    let _ = map.insert("value".to_string(), other);
                    map
                }
            };
            out.tool_calls.push(ToolCall {
                id: new_call_id(),
                name: call.name,
                arguments,
            });
        }
        if let Some(result) = part.code_execution_result {
            out.code_execution_results.push(result.output);
        }
    }
    out.text = texts.join("");

    if let Some(grounding) = candidate.grounding_metadata {
        for chunk in grounding.grounding_chunks {
            if let Some(web) = chunk.web {
                out.search_results.push(SearchResult {
                    title: web.title,
                    url: web.uri,
                    snippet: String::new(),
                });
            }
        }
    }

    if let Some(usage) = wire.usage_metadata {
        out.usage = TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            thinking_tokens: usage.thoughts_token_count,
        };
    }

    Ok(out)
}

fn is_abnormal_finish(reason: &str) -> bool {
    !matches!(reason, "STOP" | "MAX_TOKENS")
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<WireGrounding>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct WirePart {
    text: Option<String>,
    thought: Option<bool>,
    #[serde(rename = "functionCall")]
    function_call: Option<WireFunctionCall>,
    #[serde(rename = "codeExecutionResult")]
    code_execution_result: Option<WireCodeResult>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
struct WireCodeResult {
    #[serde(default)]
    output: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
    #[serde(rename = "thoughtsTokenCount", default)]
    thoughts_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct WireGrounding {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    web: Option<WireWebSource>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireWebSource {
    #[serde(default)]
    title: String,
    #[serde(default)]
    uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerateOptions;
    use foreman_core::tools::{ToolDefinition, ToolParameterSchema};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url,
            temperature: 0.4,
            max_output_tokens: 8192,
        }
    }

    fn request(options: GenerateOptions) -> GenerateRequest {
        GenerateRequest {
            messages: vec![ChatMessage::user("hello")],
            system: "be helpful".to_string(),
            options,
        }
    }

    #[tokio::test]
    async fn parses_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "hi there" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": {
                    "promptTokenCount": 12,
                    "candidatesTokenCount": 4,
                    "thoughtsTokenCount": 2
                }
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(config(server.uri())).unwrap();
        let out = backend.generate(&request(GenerateOptions::default())).await.unwrap();
        assert_eq!(out.text, "hi there");
        assert!(out.tool_calls.is_empty());
        assert_eq!(out.usage.input_tokens, 12);
        assert_eq!(out.usage.output_tokens, 4);
        assert_eq!(out.usage.thinking_tokens, 2);
    }

    #[tokio::test]
    async fn parses_function_calls_and_skips_thoughts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [
                        { "text": "planning...", "thought": true },
                        { "functionCall": { "name": "web_search", "args": { "query": "rust" } } }
                    ]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(config(server.uri())).unwrap();
        let out = backend.generate(&request(GenerateOptions::default())).await.unwrap();
        assert_eq!(out.text, "");
        assert_eq!(out.tool_calls.len(), 1);
        assert_eq!(out.tool_calls[0].name, "web_search");
        assert_eq!(out.tool_calls[0].arguments["query"], "rust");
        assert!(out.tool_calls[0].id.starts_with("call-"));
    }

    #[tokio::test]
    async fn sends_function_declarations_and_native_flags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "tools": [{ "googleSearch": {} }, { "codeExecution": {} }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "ok" }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(config(server.uri())).unwrap();
        let options = GenerateOptions {
            use_search: true,
            use_code_execution: true,
            ..GenerateOptions::default()
        };
        let out = backend.generate(&request(options)).await.unwrap();
        assert_eq!(out.text, "ok");

        // Function declarations serialize with name/description/parameters.
        let def = ToolDefinition {
            name: "ask_user".to_string(),
            description: "ask".to_string(),
            parameters: ToolParameterSchema::default(),
        };
        let body = backend.build_body(&request(GenerateOptions {
            tools: vec![def],
            ..GenerateOptions::default()
        }));
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "ask_user");
    }

    #[tokio::test]
    async fn api_errors_surface_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(config(server.uri())).unwrap();
        let err = backend.generate(&request(GenerateOptions::default())).await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 429, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn safety_stop_without_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(config(server.uri())).unwrap();
        let err = backend.generate(&request(GenerateOptions::default())).await.unwrap_err();
        assert!(matches!(err, BackendError::EmptyResponse { .. }));
    }

    #[test]
    fn tool_messages_become_function_responses() {
        let content = to_content(&ChatMessage::tool("result body"));
        assert_eq!(content["role"], "user");
        assert_eq!(
            content["parts"][0]["functionResponse"]["response"]["content"],
            "result body"
        );
    }

    #[test]
    fn grounding_chunks_become_search_results() {
        let wire: WireResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "answer" }] },
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "title": "Doc", "uri": "https://example.com" } }
                    ]
                }
            }]
        }))
        .unwrap();
        let out = parse_response(wire).unwrap();
        assert_eq!(out.search_results.len(), 1);
        assert_eq!(out.search_results[0].url, "https://example.com");
    }
}

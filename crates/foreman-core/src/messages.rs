//! Chat messages, tool calls, and token accounting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    User,
    /// The reasoning backend.
    Assistant,
    /// A synthetic message carrying serialized tool results.
    Tool,
}

/// A single message in a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message author.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Optional base64-encoded images attached to the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    /// Build a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Build an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Build a tool-results message.
    #[must_use]
    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            images: Vec::new(),
        }
    }
}

/// A function call requested by the reasoning backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call id within the response.
    pub id: String,
    /// Declared tool name.
    pub name: String,
    /// JSON object of arguments.
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a new tool call.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Token usage reported by the reasoning backend.
///
/// All fields default to zero so partial provider reports deserialize
/// cleanly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Prompt tokens consumed.
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens produced.
    #[serde(default)]
    pub output_tokens: u64,
    /// Thinking/reasoning tokens, where the provider reports them.
    #[serde(default)]
    pub thinking_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another usage report into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.thinking_tokens += other.thinking_tokens;
    }

    /// Total tokens across all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.thinking_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_constructors() {
        assert_eq!(ChatMessage::user("hi").role, Role::User);
        assert_eq!(ChatMessage::assistant("ok").role, Role::Assistant);
        assert_eq!(ChatMessage::tool("{}").role, Role::Tool);
    }

    #[test]
    fn message_images_skipped_when_empty() {
        let v = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(v.get("images").is_none());
    }

    #[test]
    fn usage_add_accumulates() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            thinking_tokens: 2,
        });
        total.add(&TokenUsage {
            input_tokens: 1,
            output_tokens: 1,
            thinking_tokens: 0,
        });
        assert_eq!(total.input_tokens, 11);
        assert_eq!(total.output_tokens, 6);
        assert_eq!(total.thinking_tokens, 2);
        assert_eq!(total.total(), 19);
    }

    #[test]
    fn usage_deserializes_partial_reports() {
        let usage: TokenUsage = serde_json::from_value(json!({"inputTokens": 7})).unwrap();
        assert_eq!(usage.input_tokens, 7);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn tool_call_new() {
        let tc = ToolCall::new("c1", "web_search", Map::new());
        assert_eq!(tc.id, "c1");
        assert_eq!(tc.name, "web_search");
        assert!(tc.arguments.is_empty());
    }
}

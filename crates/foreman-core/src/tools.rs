//! Tool declarations and the uniform tool outcome type.
//!
//! [`ToolResult`] is the only shape that crosses the tool registry boundary.
//! Every tool implementation normalizes into it, including on internal
//! failure — the orchestration loop never sees a tool panic or error type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key carrying a structured error code on failed results.
pub const META_ERROR: &str = "error";
/// Metadata key carrying free-form error details.
pub const META_DETAILS: &str = "details";
/// Metadata key set by tools that require the loop to pause for user input.
pub const META_REQUIRES_USER_INPUT: &str = "requiresUserInput";

/// Error code for a call to an undeclared tool.
pub const ERR_TOOL_NOT_FOUND: &str = "TOOL_NOT_FOUND";
/// Error code for an exception inside a tool implementation.
pub const ERR_EXECUTION: &str = "EXECUTION_ERROR";
/// Error code for a tool whose memory backend is not configured.
pub const ERR_MEMORY_NOT_AVAILABLE: &str = "MEMORY_NOT_AVAILABLE";
/// Error code for a tool whose object storage backend is not configured.
pub const ERR_STORAGE_NOT_AVAILABLE: &str = "STORAGE_NOT_AVAILABLE";

/// JSON Schema fragment describing a tool's parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Always `"object"` for function declarations.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property name → schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    /// Names of required properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl Default for ToolParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: None,
            required: None,
        }
    }
}

/// A declared callable operation: name, description, parameter schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name as exposed to the reasoning backend.
    pub name: String,
    /// Usage guidance for the reasoning backend.
    pub description: String,
    /// Parameter schema.
    pub parameters: ToolParameterSchema,
}

/// Uniform outcome of a tool execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// Whether the tool succeeded.
    pub success: bool,
    /// Structured payload for the reasoning backend.
    pub data: Value,
    /// Human-readable one-line summary.
    pub summary: String,
    /// Open metadata map; see the `META_*` keys.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ToolResult {
    /// Build a successful result.
    #[must_use]
    pub fn ok(data: Value, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            summary: summary.into(),
            metadata: Map::new(),
        }
    }

    /// Build a failed result carrying a structured error code.
    #[must_use]
    pub fn failure(code: &str, summary: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        let _ = metadata.insert(META_ERROR.into(), Value::String(code.into()));
        Self {
            success: false,
            data: Value::Null,
            summary: summary.into(),
            metadata,
        }
    }

    /// Attach a metadata entry (builder style).
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        let _ = self.metadata.insert(key.into(), value);
        self
    }

    /// The structured error code, if this is a failure.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.metadata.get(META_ERROR).and_then(Value::as_str)
    }

    /// Whether this result asks the loop to pause for user input.
    #[must_use]
    pub fn requires_user_input(&self) -> bool {
        self.metadata
            .get(META_REQUIRES_USER_INPUT)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_result() {
        let r = ToolResult::ok(json!({"hits": 3}), "found 3 results");
        assert!(r.success);
        assert_eq!(r.summary, "found 3 results");
        assert!(r.error_code().is_none());
        assert!(!r.requires_user_input());
    }

    #[test]
    fn failure_carries_code() {
        let r = ToolResult::failure(ERR_TOOL_NOT_FOUND, "no such tool");
        assert!(!r.success);
        assert_eq!(r.error_code(), Some(ERR_TOOL_NOT_FOUND));
        assert_eq!(r.data, Value::Null);
    }

    #[test]
    fn requires_user_input_flag() {
        let r = ToolResult::ok(Value::Null, "question")
            .with_metadata(META_REQUIRES_USER_INPUT, json!(true));
        assert!(r.requires_user_input());
    }

    #[test]
    fn metadata_skipped_when_empty() {
        let v = serde_json::to_value(ToolResult::ok(Value::Null, "s")).unwrap();
        assert!(v.get("metadata").is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let r = ToolResult::failure(ERR_EXECUTION, "boom")
            .with_metadata(META_DETAILS, json!("stack trace"));
        let back: ToolResult =
            serde_json::from_value(serde_json::to_value(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }
}

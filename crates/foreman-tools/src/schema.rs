//! Small builder for tool parameter schemas.

use serde_json::{Map, Value};

use foreman_core::tools::{ToolDefinition, ToolParameterSchema};

/// Fluent builder for a [`ToolDefinition`] with an object parameter schema.
pub struct ToolSchemaBuilder {
    name: String,
    description: String,
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ToolSchemaBuilder {
    /// Start a definition for the named tool.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Add an optional property.
    #[must_use]
    pub fn prop(mut self, name: &str, schema: Value) -> Self {
        let _ = self.properties.insert(name.to_string(), schema);
        self
    }

    /// Add a required property.
    #[must_use]
    pub fn required(mut self, name: &str, schema: Value) -> Self {
        let _ = self.properties.insert(name.to_string(), schema);
        self.required.push(name.to_string());
        self
    }

    /// Finish the definition.
    #[must_use]
    pub fn build(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            description: self.description,
            parameters: ToolParameterSchema {
                schema_type: "object".to_string(),
                properties: if self.properties.is_empty() {
                    None
                } else {
                    Some(self.properties)
                },
                required: if self.required.is_empty() { None } else { Some(self.required) },
            },
        }
    }
}

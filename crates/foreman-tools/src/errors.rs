//! Tool error types.
//!
//! These never cross the registry boundary — the registry normalizes every
//! [`ToolError`] into a failed `ToolResult` before returning.

/// Errors raised inside tool implementations and delegate traits.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments did not match the tool's parameter schema.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// What was wrong.
        message: String,
    },

    /// A delegate or backend failed.
    #[error("{message}")]
    Internal {
        /// Error description.
        message: String,
    },

    /// The requested entity does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// What was missing.
        message: String,
    },
}

impl ToolError {
    /// Shorthand for [`ToolError::Internal`].
    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal { message: message.to_string() }
    }

    /// Shorthand for [`ToolError::InvalidArguments`].
    pub fn invalid(message: impl std::fmt::Display) -> Self {
        Self::InvalidArguments { message: message.to_string() }
    }
}

impl From<foreman_store::StoreError> for ToolError {
    fn from(err: foreman_store::StoreError) -> Self {
        match err {
            foreman_store::StoreError::NotFound(what) => Self::NotFound { message: what },
            other => Self::internal(other),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid(err)
    }
}

//! Backend error types.

/// Errors raised by reasoning backends.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend returned an API-level error.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description from the backend.
        message: String,
    },

    /// The response arrived but carried no usable candidate.
    #[error("empty response: {reason}")]
    EmptyResponse {
        /// Finish reason or other explanation.
        reason: String,
    },

    /// The test backend's script ran out of canned responses.
    #[error("script exhausted after {served} responses")]
    ScriptExhausted {
        /// How many responses were served before running dry.
        served: usize,
    },
}

impl BackendError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::EmptyResponse { .. } | Self::ScriptExhausted { .. } => false,
        }
    }
}

//! Settings error types.

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON or has the wrong shape.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

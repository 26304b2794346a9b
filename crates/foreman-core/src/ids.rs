//! Validated identifier newtypes.

use serde::{Deserialize, Serialize};

/// Maximum session id length.
const MAX_SESSION_ID_LEN: usize = 64;

/// A session id rejected at construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid session id {id:?}: {reason}")]
pub struct InvalidSessionId {
    /// The offending input (truncated for display).
    pub id: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// A validated session identifier.
///
/// Session ids are alphanumeric plus hyphen/underscore, 1–64 characters.
/// Construction via [`SessionId::parse`] is the only way to obtain one, so
/// any `SessionId` in circulation is known-valid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a raw session id.
    pub fn parse(raw: &str) -> Result<Self, InvalidSessionId> {
        if raw.is_empty() {
            return Err(InvalidSessionId {
                id: String::new(),
                reason: "must not be empty",
            });
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(InvalidSessionId {
                id: format!("{}…", &raw[..MAX_SESSION_ID_LEN]),
                reason: "exceeds 64 characters",
            });
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidSessionId {
                id: raw.to_string(),
                reason: "only alphanumeric, hyphen, and underscore are allowed",
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// The validated id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a fresh tool-call id (`call-` prefixed UUIDv7).
#[must_use]
pub fn new_call_id() -> String {
    format!("call-{}", uuid::Uuid::now_v7())
}

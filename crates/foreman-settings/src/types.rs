//! Settings type definitions with compiled defaults.

use serde::{Deserialize, Serialize};

/// Top-level Foreman settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForemanSettings {
    /// Orchestration loop settings.
    pub agent: AgentSettings,
    /// Reasoning backend settings.
    pub backend: BackendSettings,
    /// Storage locations.
    pub storage: StorageSettings,
    /// Web search settings.
    pub search: SearchSettings,
}

/// Admin/worker loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Turn ceiling for the admin orchestration loop.
    pub max_turns: u32,
    /// Default turn budget for delegated workers.
    pub worker_max_turns: u32,
    /// Interval in seconds between background history flushes.
    pub history_flush_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_turns: 10,
            worker_max_turns: 5,
            history_flush_secs: 30,
        }
    }
}

/// Reasoning backend connection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    /// API key. Empty means not configured.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL of the generate endpoint.
    pub base_url: String,
    /// Admin sampling temperature.
    pub temperature: f32,
    /// Admin output token ceiling.
    pub max_output_tokens: u32,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            temperature: 0.4,
            max_output_tokens: 8192,
        }
    }
}

/// Storage locations for documents, messages, and blobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Directory holding the SQLite database and blob tree.
    /// Empty means in-memory (degraded) mode.
    pub data_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
        }
    }
}

/// Web search API settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    /// Search API key. Empty means the tool runs degraded.
    pub api_key: String,
    /// Search API base URL.
    pub base_url: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.search.brave.com".into(),
        }
    }
}

//! Worker capability profiles and the delegation exchange types.
//!
//! A worker is a stateless, capability-scoped reasoning process. Its
//! [`WorkerType`] fixes which native tools it may use, its sampling
//! temperature, its output ceiling, and its system prompt. The admin owns
//! cross-step memory; workers receive everything they need in a
//! [`WorkerContext`] and hand everything back in a [`WorkerResult`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::artifacts::Artifact;

/// Default turn budget for a delegated worker.
pub const DEFAULT_WORKER_TURNS: u32 = 5;

/// Coverage percentage at or above which a worker assignment is accepted
/// even when the capability match is not perfect.
pub const COVERAGE_ACCEPTABLE: u32 = 80;

/// A native backend capability usable only by workers, never the admin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Provider-side web search grounding.
    Search,
    /// Provider-side code execution sandbox.
    CodeExecution,
    /// Provider-side URL fetching.
    UrlContext,
}

/// Fixed capability profile of a worker type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkerProfile {
    /// Native search access.
    pub search: bool,
    /// Native code-execution access.
    pub code_execution: bool,
    /// Native URL-context access.
    pub url_context: bool,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token ceiling.
    pub max_output_tokens: u32,
}

impl WorkerProfile {
    /// Whether this profile grants the given capability.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Search => self.search,
            Capability::CodeExecution => self.code_execution,
            Capability::UrlContext => self.url_context,
        }
    }
}

/// Specialized worker executor kinds.
///
/// Unknown strings in legacy documents deserialize as `General`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    /// Web research: search + URL context, no code execution.
    Researcher,
    /// Code writing and execution.
    Coder,
    /// Data analysis: search + code execution.
    Analyst,
    /// Long-form prose; no native tools.
    Writer,
    /// Generalist with every capability. The default assignment.
    #[default]
    #[serde(other)]
    General,
}

impl WorkerType {
    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Coder => "coder",
            Self::Analyst => "analyst",
            Self::Writer => "writer",
            Self::General => "general",
        }
    }

    /// All worker types, for declaration enums and coverage scans.
    #[must_use]
    pub fn all() -> &'static [WorkerType] {
        &[
            Self::Researcher,
            Self::Coder,
            Self::Analyst,
            Self::Writer,
            Self::General,
        ]
    }

    /// The fixed capability profile for this worker type.
    #[must_use]
    pub fn profile(self) -> WorkerProfile {
        match self {
            Self::Researcher => WorkerProfile {
                search: true,
                code_execution: false,
                url_context: true,
                temperature: 0.3,
                max_output_tokens: 8192,
            },
            Self::Coder => WorkerProfile {
                search: false,
                code_execution: true,
                url_context: false,
                temperature: 0.2,
                max_output_tokens: 8192,
            },
            Self::Analyst => WorkerProfile {
                search: true,
                code_execution: true,
                url_context: false,
                temperature: 0.2,
                max_output_tokens: 8192,
            },
            Self::Writer => WorkerProfile {
                search: false,
                code_execution: false,
                url_context: false,
                temperature: 0.7,
                max_output_tokens: 16384,
            },
            Self::General => WorkerProfile {
                search: true,
                code_execution: true,
                url_context: true,
                temperature: 0.4,
                max_output_tokens: 8192,
            },
        }
    }
}

impl std::fmt::Display for WorkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage of required capabilities covered by a worker type.
///
/// `covered / required * 100`, rounded down. An empty requirement list is
/// fully covered. Callers treat values at or above [`COVERAGE_ACCEPTABLE`]
/// as good enough even when the match is not perfect.
#[must_use]
pub fn assignment_coverage(required: &[Capability], worker: WorkerType) -> u32 {
    if required.is_empty() {
        return 100;
    }
    let profile = worker.profile();
    let covered = required.iter().filter(|c| profile.has(**c)).count();
    (covered * 100 / required.len()) as u32
}

/// Everything a worker invocation needs. Ephemeral, never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerContext {
    /// Which profile to run.
    pub worker_type: WorkerType,
    /// What the worker must achieve.
    pub objective: String,
    /// Longer description of the step being executed.
    #[serde(default)]
    pub step_description: String,
    /// Constraints the worker must respect.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Outputs of previously completed steps (admin-owned memory).
    #[serde(default)]
    pub previous_step_outputs: Vec<String>,
    /// Turn budget for the private loop.
    #[serde(default = "default_worker_turns")]
    pub max_turns: u32,
    /// Task this invocation belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Step number within the task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
}

fn default_worker_turns() -> u32 {
    DEFAULT_WORKER_TURNS
}

/// Execution accounting attached to a [`WorkerResult`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResultMetadata {
    /// Round-trips actually made to the reasoning backend.
    pub turns_used: u32,
    /// Native tools observed in use.
    #[serde(default)]
    pub tools_used: BTreeSet<String>,
    /// Total tokens consumed.
    pub tokens_consumed: u64,
    /// Thinking tokens, where reported.
    pub thinking_tokens: u64,
}

/// Outcome of one worker invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResult {
    /// Whether the worker delivered (best-effort delivery on turn
    /// exhaustion still counts as success).
    pub success: bool,
    /// Final output text.
    pub output: String,
    /// Artifacts materialized from the worker's responses.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Free-form observations for the admin.
    #[serde(default)]
    pub observations: Vec<String>,
    /// Execution accounting.
    pub metadata: WorkerResultMetadata,
}

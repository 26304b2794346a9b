//! Agent lifecycle events.
//!
//! [`ForemanEvent`] is broadcast by the runtime while a chat request is
//! processed: loop boundaries, tool executions, delegations, phase changes,
//! and task mutations. Events are transient — they drive observers, never
//! replay.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messages::TokenUsage;
use crate::tasks::TaskStatus;
use crate::worker::WorkerType;

/// Common fields for all agent events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Session this event belongs to.
    pub session_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Create a new base event with the current UTC timestamp.
    #[must_use]
    pub fn now(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// High-level agent lifecycle events with session context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ForemanEvent {
    /// A chat request started processing.
    #[serde(rename = "agent_start")]
    AgentStart {
        /// Common fields.
        base: BaseEvent,
    },

    /// A chat request finished (final answer, pause, or exhaustion).
    #[serde(rename = "agent_end")]
    AgentEnd {
        /// Common fields.
        base: BaseEvent,
        /// Turns consumed by the admin loop.
        turns_used: u32,
    },

    /// An admin turn began (one reasoning-backend round-trip).
    #[serde(rename = "turn_start")]
    TurnStart {
        /// Common fields.
        base: BaseEvent,
        /// 1-based turn number.
        turn: u32,
    },

    /// An admin turn ended.
    #[serde(rename = "turn_end")]
    TurnEnd {
        /// Common fields.
        base: BaseEvent,
        /// 1-based turn number.
        turn: u32,
        /// Tokens consumed by this turn.
        usage: TokenUsage,
    },

    /// A tool call is about to execute.
    #[serde(rename = "tool_execution_start")]
    ToolExecutionStart {
        /// Common fields.
        base: BaseEvent,
        /// Tool call id.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool name.
        tool_name: String,
        /// Arguments as given by the backend.
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<Map<String, Value>>,
    },

    /// A tool call finished.
    #[serde(rename = "tool_execution_end")]
    ToolExecutionEnd {
        /// Common fields.
        base: BaseEvent,
        /// Tool call id.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool name.
        tool_name: String,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
        /// Whether the tool reported failure.
        is_error: bool,
    },

    /// A worker delegation started.
    #[serde(rename = "delegation_start")]
    DelegationStart {
        /// Common fields.
        base: BaseEvent,
        /// Worker profile invoked.
        worker_type: WorkerType,
        /// Objective handed to the worker.
        objective: String,
    },

    /// A worker delegation finished.
    #[serde(rename = "delegation_end")]
    DelegationEnd {
        /// Common fields.
        base: BaseEvent,
        /// Worker profile invoked.
        worker_type: WorkerType,
        /// Whether the worker delivered.
        success: bool,
        /// Worker turns consumed.
        turns_used: u32,
    },

    /// The conversation phase changed.
    #[serde(rename = "phase_changed")]
    PhaseChanged {
        /// Common fields.
        base: BaseEvent,
        /// Previous phase.
        from: String,
        /// New phase.
        to: String,
        /// Why the transition happened.
        reason: String,
    },

    /// A task document was created or mutated.
    #[serde(rename = "task_updated")]
    TaskUpdated {
        /// Common fields.
        base: BaseEvent,
        /// Task id.
        task_id: String,
        /// Recomputed task status.
        status: TaskStatus,
        /// Step that changed, when the mutation targeted one.
        #[serde(skip_serializing_if = "Option::is_none")]
        step_number: Option<u32>,
    },
}

impl ForemanEvent {
    /// The session this event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::AgentStart { base }
            | Self::AgentEnd { base, .. }
            | Self::TurnStart { base, .. }
            | Self::TurnEnd { base, .. }
            | Self::ToolExecutionStart { base, .. }
            | Self::ToolExecutionEnd { base, .. }
            | Self::DelegationStart { base, .. }
            | Self::DelegationEnd { base, .. }
            | Self::PhaseChanged { base, .. }
            | Self::TaskUpdated { base, .. } => &base.session_id,
        }
    }

    /// The wire tag for this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AgentStart { .. } => "agent_start",
            Self::AgentEnd { .. } => "agent_end",
            Self::TurnStart { .. } => "turn_start",
            Self::TurnEnd { .. } => "turn_end",
            Self::ToolExecutionStart { .. } => "tool_execution_start",
            Self::ToolExecutionEnd { .. } => "tool_execution_end",
            Self::DelegationStart { .. } => "delegation_start",
            Self::DelegationEnd { .. } => "delegation_end",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::TaskUpdated { .. } => "task_updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization() {
        let event = ForemanEvent::TurnStart {
            base: BaseEvent::now("s1"),
            turn: 1,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "turn_start");
        assert_eq!(v["base"]["sessionId"], "s1");
    }

    #[test]
    fn session_id_accessor() {
        let event = ForemanEvent::AgentStart {
            base: BaseEvent::now("s9"),
        };
        assert_eq!(event.session_id(), "s9");
        assert_eq!(event.event_type(), "agent_start");
    }

    #[test]
    fn roundtrip() {
        let event = ForemanEvent::DelegationEnd {
            base: BaseEvent::now("s1"),
            worker_type: WorkerType::Coder,
            success: true,
            turns_used: 3,
        };
        let back: ForemanEvent =
            serde_json::from_value(serde_json::to_value(&event).unwrap()).unwrap();
        assert_eq!(back, event);
    }
}

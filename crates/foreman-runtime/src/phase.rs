//! Conversation-phase state machine.
//!
//! Exactly one phase is active per session. Transitions are restricted to a
//! directed table; every applied transition is recorded, and entering
//! discovery always drops the active task context.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::PhaseError;

/// The five conversation phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Understanding what the user wants. No task context.
    #[default]
    Discovery,
    /// Designing a plan of steps.
    Planning,
    /// Executing steps, usually via delegation.
    Execution,
    /// Reviewing step results.
    Review,
    /// Presenting results to the user.
    Delivery,
}

impl Phase {
    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Planning => "planning",
            Self::Execution => "execution",
            Self::Review => "review",
            Self::Delivery => "delivery",
        }
    }

    /// Phases directly reachable from this one.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [Phase] {
        match self {
            Self::Discovery => &[Self::Planning, Self::Execution, Self::Delivery],
            Self::Planning => &[Self::Execution, Self::Discovery],
            Self::Execution => &[Self::Review, Self::Discovery, Self::Delivery],
            Self::Review => &[Self::Execution, Self::Delivery, Self::Discovery],
            Self::Delivery => &[Self::Discovery],
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied transition. Append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTransition {
    /// Phase left.
    pub from: Phase,
    /// Phase entered.
    pub to: Phase,
    /// Why the transition happened.
    pub reason: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Session-scoped phase state. Owned by the session actor; callers get
/// copies, never live references.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseContext {
    /// The active phase.
    pub current_phase: Phase,
    /// The task the session is executing, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_task_id: Option<String>,
    /// Step within the active task, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_number: Option<u32>,
    /// Every transition applied so far, in order.
    #[serde(default)]
    pub history: Vec<PhaseTransition>,
}

/// Situational flags fed to [`PhaseMachine::recommend_next_phase`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseSignals {
    /// At least one task exists with work remaining.
    pub has_active_tasks: bool,
    /// A step just finished.
    pub step_completed: bool,
    /// Every step of the active task is complete.
    pub all_steps_complete: bool,
    /// The conversation is blocked on the user.
    pub needs_user_input: bool,
    /// The user asked to start something new.
    pub user_requested_new: bool,
}

/// The state machine proper.
#[derive(Debug, Default)]
pub struct PhaseMachine {
    context: PhaseContext,
}

impl PhaseMachine {
    /// A machine starting in discovery with empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The active phase.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.context.current_phase
    }

    /// Whether `to` is reachable from the current phase. A no-op target
    /// (`to == current`) is always permitted.
    #[must_use]
    pub fn can_transition(&self, to: Phase) -> bool {
        to == self.context.current_phase
            || self.context.current_phase.allowed_transitions().contains(&to)
    }

    /// Apply a transition.
    ///
    /// A disallowed edge fails without mutating anything. A no-op
    /// (`to == current`) succeeds but records no transition. Entering
    /// discovery clears the active task context.
    pub fn transition_to(
        &mut self,
        to: Phase,
        reason: impl Into<String>,
    ) -> Result<(), PhaseError> {
        let from = self.context.current_phase;
        if to == from {
            return Ok(());
        }
        if !from.allowed_transitions().contains(&to) {
            return Err(PhaseError::InvalidTransition {
                from,
                to,
                allowed: from.allowed_transitions().to_vec(),
            });
        }

        let reason = reason.into();
        info!(%from, %to, %reason, "phase transition");
        self.context.history.push(PhaseTransition {
            from,
            to,
            reason,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        self.context.current_phase = to;
        if to == Phase::Discovery {
            // Discovery has no task context by definition.
            self.context.active_task_id = None;
            self.context.current_step_number = None;
        }
        Ok(())
    }

    /// Bind the active task (and optionally its first step).
    pub fn set_active_task(&mut self, task_id: impl Into<String>, initial_step: Option<u32>) {
        self.context.active_task_id = Some(task_id.into());
        self.context.current_step_number = initial_step;
    }

    /// Drop the active task binding without changing phase.
    pub fn clear_active_task(&mut self) {
        self.context.active_task_id = None;
        self.context.current_step_number = None;
    }

    /// A copy of the phase context. Callers must not expect to mutate the
    /// machine through it.
    #[must_use]
    pub fn context(&self) -> PhaseContext {
        self.context.clone()
    }

    /// Pure advisory mapping from situation to a suggested phase. Never
    /// transitions — callers still choose whether to call
    /// [`transition_to`](Self::transition_to).
    #[must_use]
    pub fn recommend_next_phase(signals: PhaseSignals) -> (Phase, &'static str) {
        if signals.user_requested_new {
            (Phase::Discovery, "user requested something new")
        } else if signals.needs_user_input {
            (Phase::Review, "blocked on user input")
        } else if signals.all_steps_complete {
            (Phase::Delivery, "all steps complete")
        } else if signals.step_completed {
            (Phase::Review, "step finished, review results")
        } else if signals.has_active_tasks {
            (Phase::Execution, "active task has remaining steps")
        } else {
            (Phase::Discovery, "nothing in flight")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL: [Phase; 5] = [
        Phase::Discovery,
        Phase::Planning,
        Phase::Execution,
        Phase::Review,
        Phase::Delivery,
    ];

    fn machine_in(phase: Phase) -> PhaseMachine {
        let mut m = PhaseMachine::new();
        // Walk a legal path to the target phase.
        match phase {
            Phase::Discovery => {}
            Phase::Planning => m.transition_to(Phase::Planning, "t").unwrap(),
            Phase::Execution => m.transition_to(Phase::Execution, "t").unwrap(),
            Phase::Review => {
                m.transition_to(Phase::Execution, "t").unwrap();
                m.transition_to(Phase::Review, "t").unwrap();
            }
            Phase::Delivery => m.transition_to(Phase::Delivery, "t").unwrap(),
        }
        assert_eq!(m.current_phase(), phase);
        m
    }

    #[test]
    fn can_transition_matches_table_for_every_pair() {
        for from in ALL {
            let m = machine_in(from);
            for to in ALL {
                let expected = to == from || from.allowed_transitions().contains(&to);
                assert_eq!(m.can_transition(to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn disallowed_edge_mutates_nothing() {
        let mut m = machine_in(Phase::Planning);
        let history_before = m.context().history;
        let err = m.transition_to(Phase::Review, "jump").unwrap_err();
        assert_matches!(
            err,
            PhaseError::InvalidTransition { from: Phase::Planning, to: Phase::Review, .. }
        );
        assert_eq!(m.current_phase(), Phase::Planning);
        assert_eq!(m.context().history, history_before);
    }

    #[test]
    fn noop_transition_records_nothing() {
        let mut m = machine_in(Phase::Execution);
        let before = m.context().history.len();
        m.transition_to(Phase::Execution, "stay").unwrap();
        assert_eq!(m.context().history.len(), before);
    }

    #[test]
    fn entering_discovery_clears_task_context() {
        let mut m = machine_in(Phase::Execution);
        m.set_active_task("t-1", Some(2));
        m.transition_to(Phase::Discovery, "reset").unwrap();
        let ctx = m.context();
        assert_eq!(ctx.active_task_id, None);
        assert_eq!(ctx.current_step_number, None);
    }

    #[test]
    fn every_transition_appends_history() {
        let mut m = PhaseMachine::new();
        m.transition_to(Phase::Planning, "plan it").unwrap();
        m.transition_to(Phase::Execution, "run it").unwrap();
        let history = m.context().history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, Phase::Discovery);
        assert_eq!(history[1].to, Phase::Execution);
        assert_eq!(history[1].reason, "run it");
    }

    #[test]
    fn context_is_a_copy() {
        let mut m = machine_in(Phase::Execution);
        let mut ctx = m.context();
        ctx.active_task_id = Some("hijack".to_string());
        assert_eq!(m.context().active_task_id, None);
        m.set_active_task("t-9", None);
        assert_eq!(m.context().active_task_id.as_deref(), Some("t-9"));
    }

    #[test]
    fn recommendations_follow_priority_order() {
        let (phase, _) = PhaseMachine::recommend_next_phase(PhaseSignals {
            user_requested_new: true,
            all_steps_complete: true,
            ..Default::default()
        });
        assert_eq!(phase, Phase::Discovery);

        let (phase, _) = PhaseMachine::recommend_next_phase(PhaseSignals {
            all_steps_complete: true,
            step_completed: true,
            ..Default::default()
        });
        assert_eq!(phase, Phase::Delivery);

        let (phase, _) = PhaseMachine::recommend_next_phase(PhaseSignals {
            has_active_tasks: true,
            ..Default::default()
        });
        assert_eq!(phase, Phase::Execution);

        let (phase, _) = PhaseMachine::recommend_next_phase(PhaseSignals::default());
        assert_eq!(phase, Phase::Discovery);
    }
}

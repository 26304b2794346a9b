//! Runtime error taxonomy.

use crate::phase::Phase;

/// Phase state machine errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// The requested transition is not an edge in the transition table.
    /// Recoverable — the caller picks a different action.
    #[error("invalid transition {from} -> {to} (allowed: {allowed:?})")]
    InvalidTransition {
        /// Current phase.
        from: Phase,
        /// Requested phase.
        to: Phase,
        /// Phases reachable from `from`.
        allowed: Vec<Phase>,
    },
}

/// Task lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// No task with the given id.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// The missing task id.
        task_id: String,
    },

    /// The task exists but has no step with the given number.
    #[error("task {task_id} has no step {step_number}")]
    StepNotFound {
        /// The task.
        task_id: String,
        /// The missing step number.
        step_number: u32,
    },

    /// The stored task document is not valid JSON for a task.
    #[error("malformed task document {task_id}: {message}")]
    Malformed {
        /// The task id.
        task_id: String,
        /// What failed to parse.
        message: String,
    },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] foreman_store::StoreError),
}

/// Errors surfaced by the session actor.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A chat request is already in flight for this session.
    #[error("session {session_id} is busy")]
    SessionBusy {
        /// The busy session.
        session_id: String,
    },

    /// The reasoning backend failed in a non-retryable way.
    #[error("backend error: {0}")]
    Backend(#[from] foreman_llm::BackendError),

    /// Message history storage failed.
    #[error("history error: {0}")]
    History(#[from] foreman_store::StoreError),

    /// Phase machine rejection that could not be handled internally.
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

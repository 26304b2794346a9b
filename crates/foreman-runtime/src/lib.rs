//! # foreman-runtime
//!
//! The orchestration core: the per-session actor that runs the admin
//! reasoning loop, the conversation-phase state machine, the task/step
//! lifecycle service, and the stateless worker executor.
//!
//! One [`session::Session`] exists per session id and processes one chat
//! request at a time. Within a request it loops against the reasoning
//! backend (bounded by the configured turn ceiling), dispatches tool-call
//! batches sequentially through the tool registry, and applies the phase
//! side effects that task creation, task completion, and delegation imply.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod phase;
pub mod prompt;
pub mod session;
pub mod tasks;
pub mod worker;

pub use errors::{PhaseError, RuntimeError, TaskError};
pub use events::EventEmitter;
pub use phase::{Phase, PhaseContext, PhaseMachine, PhaseSignals, PhaseTransition};
pub use session::{ChatMetadata, ChatOutcome, DEFAULT_ADMIN_TURNS, Session, SessionStatus};
pub use tasks::TaskService;
pub use worker::WorkerExecutor;

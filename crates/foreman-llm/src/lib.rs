//! # foreman-llm
//!
//! The [`ReasoningBackend`] seam plus implementations:
//!
//! - [`gemini::GeminiBackend`] — Google Gemini over `generateContent`, with
//!   native search / code-execution / URL-context tool support.
//! - [`scripted::ScriptedBackend`] — canned responses for tests.
//!
//! Callers build a [`GenerateRequest`] from chat history and tool
//! definitions; the backend answers with text, tool calls, and usage.

#![deny(unsafe_code)]

pub mod errors;
pub mod gemini;
pub mod scripted;
pub mod types;

pub use errors::BackendError;
pub use types::{
    GenerateOptions, GenerateRequest, GenerateResponse, ReasoningBackend, SearchResult,
};

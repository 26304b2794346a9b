//! # foreman-tools
//!
//! The admin's callable tool surface: a closed [`request::ToolRequest`] sum
//! type, the [`registry::ToolRegistry`] that dispatches it, and the tool
//! implementations behind each variant.
//!
//! The registry never errors outward: an unknown tool name becomes a
//! `TOOL_NOT_FOUND` failure result, and any error inside a tool
//! implementation becomes an `EXECUTION_ERROR` failure result. The
//! orchestration loop only ever sees `ToolResult`s.
//!
//! Tools that need an optional backend (memory recall, object storage) stay
//! registered when the backend is absent and answer with a
//! `*_NOT_AVAILABLE` failure, so the reasoning backend never hallucinates
//! about tool availability.

#![deny(unsafe_code)]

pub mod artifact;
pub mod ask_user;
pub mod delegate;
pub mod errors;
pub mod knowledge;
pub mod memory;
pub mod planner;
pub mod rag;
pub mod registry;
pub mod request;
pub mod schema;
pub mod search;
pub mod traits;

pub use errors::ToolError;
pub use registry::ToolRegistry;
pub use request::ToolRequest;
pub use traits::{SearchClient, TaskPlanner, TaskUpdate, ToolContext, WebHit, WorkerRunner};

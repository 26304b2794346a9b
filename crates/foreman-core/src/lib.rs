//! # foreman-core
//!
//! Foundation types for the Foreman agent: an admin reasoning process that
//! answers user requests directly or delegates bounded sub-tasks to
//! stateless, capability-scoped workers.
//!
//! This crate provides the shared vocabulary that all other Foreman crates
//! depend on:
//!
//! - **Session ids**: [`ids::SessionId`] newtype with validation
//! - **Messages**: [`messages::ChatMessage`], [`messages::ToolCall`],
//!   [`messages::TokenUsage`]
//! - **Tool results**: [`tools::ToolResult`] — the only shape that crosses
//!   the tool registry boundary
//! - **Tasks**: [`tasks::Task`]/[`tasks::Step`] plan documents and the single
//!   pure [`tasks::recompute_task_status`] function
//! - **Workers**: [`worker::WorkerType`] capability profiles,
//!   [`worker::WorkerContext`], [`worker::WorkerResult`]
//! - **Artifacts**: [`artifacts::Artifact`] and fenced-code extraction
//! - **Events**: [`events::ForemanEvent`] for agent lifecycle broadcast
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other foreman crates.

#![deny(unsafe_code)]

pub mod artifacts;
pub mod events;
pub mod ids;
pub mod messages;
pub mod tasks;
pub mod text;
pub mod tools;
pub mod worker;

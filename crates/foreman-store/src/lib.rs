//! # foreman-store
//!
//! Storage interfaces consumed by the orchestration core, plus the bundled
//! backends:
//!
//! - [`DocumentStore`] — whole-document key/value JSON (task documents,
//!   checkpoint snapshots). Load whole document, mutate, write whole
//!   document; no field-level locking.
//! - [`MessageLog`] — append-only per-session message history.
//! - [`ObjectStore`] — hierarchical blob namespace (task files, artifacts,
//!   knowledge tree).
//! - [`MemoryRecall`] — vector-search memory client, optional.
//!
//! Backends: [`memory`] (tests and degraded mode), [`sqlite`] (durable
//! documents + messages), [`fs`] (local-filesystem object store).
//!
//! The stores are constructed once at startup and injected into the
//! components that need them — there is no global storage client.

#![deny(unsafe_code)]

pub mod errors;
pub mod fs;
pub mod memory;
pub mod sqlite;
mod traits;

pub use errors::StoreError;
pub use traits::{
    DirListing, DocumentStore, Entry, FileEntry, MemoryHit, MemoryRecall, MessageLog,
    ObjectStore,
};

//! # foreman-settings
//!
//! Configuration management with layered sources for the Foreman agent.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`ForemanSettings::default()`]
//! 2. **Settings file** — JSON, deep-merged over defaults
//! 3. **Environment variables** — `FOREMAN_*` overrides (highest priority)
//!
//! There is deliberately no global settings singleton: the binary loads
//! settings once at startup and injects them into the components that need
//! them. This keeps degraded-mode paths (no API key, no data dir) explicit
//! and testable.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::SettingsError;
pub use loader::{deep_merge, load_settings, load_settings_from_path};
pub use types::*;

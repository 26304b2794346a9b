//! Settings loading: defaults ← file ← environment.

use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::errors::SettingsError;
use crate::types::ForemanSettings;

/// Deep-merge `overlay` into `base`. Objects merge recursively; any other
/// value in `overlay` replaces the value in `base`.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        let _ = base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, _) => *base_slot = overlay.clone(),
    }
}

/// Load settings from a specific JSON file, deep-merged over compiled
/// defaults, then apply `FOREMAN_*` environment overrides.
///
/// A missing file is not an error — defaults plus env are returned.
pub fn load_settings_from_path(path: &Path) -> Result<ForemanSettings, SettingsError> {
    let mut merged = serde_json::to_value(ForemanSettings::default())?;
    if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let overlay: Value = serde_json::from_str(&raw)?;
        deep_merge(&mut merged, &overlay);
    } else {
        warn!(?path, "settings file not found, using defaults");
    }
    let mut settings: ForemanSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Load settings from defaults plus environment only.
pub fn load_settings() -> ForemanSettings {
    let mut settings = ForemanSettings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Apply `FOREMAN_*` environment variable overrides (highest priority).
fn apply_env_overrides(settings: &mut ForemanSettings) {
    if let Ok(key) = std::env::var("FOREMAN_API_KEY") {
        settings.backend.api_key = key;
    }
    if let Ok(model) = std::env::var("FOREMAN_MODEL") {
        settings.backend.model = model;
    }
    if let Ok(dir) = std::env::var("FOREMAN_DATA_DIR") {
        settings.storage.data_dir = dir;
    }
    if let Ok(key) = std::env::var("FOREMAN_SEARCH_API_KEY") {
        settings.search.api_key = key;
    }
    if let Ok(turns) = std::env::var("FOREMAN_MAX_TURNS") {
        match turns.parse() {
            Ok(n) => settings.agent.max_turns = n,
            Err(_) => warn!(value = %turns, "ignoring non-numeric FOREMAN_MAX_TURNS"),
        }
    }
}

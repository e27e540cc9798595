//! Settings loading: defaults → file → environment.
//!
//! The file layer is deep-merged over compiled defaults so a settings file
//! only needs the keys it changes. Environment variables win over both.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::Result;
use crate::types::WardSettings;

/// Resolve the settings file path.
///
/// `WARD_SETTINGS_PATH` overrides the default `~/.ward/settings.json`.
#[must_use]
pub fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var("WARD_SETTINGS_PATH") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".ward").join("settings.json")
}

/// Deep-merge `overlay` into `base`.
///
/// Objects merge recursively; any other value type in `overlay` replaces
/// the corresponding `base` value wholesale (arrays included).
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides applied.
///
/// A missing file is not an error: defaults plus env overrides are returned.
pub fn load_settings() -> Result<WardSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file path with env overrides applied.
pub fn load_settings_from_path(path: &Path) -> Result<WardSettings> {
    let defaults = serde_json::to_value(WardSettings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let file_value: Value = serde_json::from_str(&raw)?;
        deep_merge(defaults, file_value)
    } else {
        defaults
    };

    let mut settings: WardSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Apply `WARD_*` environment variable overrides (highest priority).
fn apply_env_overrides(settings: &mut WardSettings) {
    if let Ok(endpoint) = std::env::var("WARD_LLM_ENDPOINT") {
        settings.llm.endpoint = endpoint;
    }
    if let Ok(deployment) = std::env::var("WARD_LLM_DEPLOYMENT") {
        settings.llm.deployment = deployment;
    }
    if let Ok(api_version) = std::env::var("WARD_LLM_API_VERSION") {
        settings.llm.api_version = api_version;
    }
    if let Ok(level) = std::env::var("WARD_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

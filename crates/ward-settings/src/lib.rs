//! # ward-settings
//!
//! Layered configuration for the Ward assistant.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`WardSettings::default()`]
//! 2. **User file** — `~/.ward/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `WARD_*` overrides (highest priority)
//!
//! The global singleton is reloadable: after the host rewrites the settings
//! file, [`reload_settings_from_path`] swaps the cached value so subsequent
//! [`get_settings`] calls return fresh data.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

/// Global settings singleton.
///
/// An `RwLock<Option<Arc<…>>>` rather than `OnceLock` so the cached value
/// can be swapped on reload. Reads are cheap (shared lock + `Arc::clone`);
/// writes only happen on reload, which is rare.
static SETTINGS: RwLock<Option<Arc<WardSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads from `~/.ward/settings.json` with env overrides.
/// On subsequent calls, returns the cached value. If loading fails, falls
/// back to compiled defaults with a warning.
///
/// Returns an `Arc` so callers hold a consistent snapshot even if another
/// thread reloads settings concurrently.
pub fn get_settings() -> Arc<WardSettings> {
    // Fast path: read lock
    {
        let guard = SETTINGS.read();
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    // Slow path: first access, take write lock
    let mut guard = SETTINGS.write();
    // Double-check after acquiring write lock (another thread may have initialized)
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            WardSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialize the global settings with a specific value.
///
/// Replaces any previously cached settings. Useful for tests and hosts that
/// construct settings themselves.
pub fn init_settings(settings: WardSettings) {
    let mut guard = SETTINGS.write();
    *guard = Some(Arc::new(settings));
}

/// Reload settings from a specific file path.
///
/// Reads the file, deep-merges over defaults, applies env overrides, and
/// atomically swaps the global cache.
pub fn reload_settings_from_path(path: &Path) {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, ?path, "failed to reload settings, falling back to defaults");
            WardSettings::default()
        }
    });
    let mut guard = SETTINGS.write();
    *guard = Some(new);
    tracing::info!(?path, "settings reloaded from disk");
}

/// Reset the global settings cache (test-only).
#[cfg(test)]
pub(crate) fn reset_settings() {
    let mut guard = SETTINGS.write();
    *guard = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that mutate the global SETTINGS static must hold this lock
    /// to avoid racing with each other (tests run in parallel threads).
    static SETTINGS_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn init_settings_sets_custom_value() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        let mut custom = WardSettings::default();
        custom.llm.deployment = "gpt-4o-test".to_string();
        init_settings(custom);
        assert_eq!(get_settings().llm.deployment, "gpt-4o-test");
        reset_settings();
    }

    #[test]
    fn reload_settings_from_path_updates_cached_value() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();

        init_settings(WardSettings::default());
        assert_eq!(get_settings().context.history_char_cap, 8000);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"context": {"historyCharCap": 2000}}"#).unwrap();

        reload_settings_from_path(&path);

        let updated = get_settings();
        assert_eq!(updated.context.history_char_cap, 2000);
        // Other defaults preserved by the deep merge
        assert_eq!(updated.context.chars_per_token, 4);

        reset_settings();
    }

    #[test]
    fn reload_from_nonexistent_path_falls_back_to_defaults() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();

        let mut custom = WardSettings::default();
        custom.context.history_char_cap = 1234;
        init_settings(custom);

        reload_settings_from_path(Path::new("/nonexistent/settings.json"));
        assert_eq!(get_settings().context.history_char_cap, 8000);

        reset_settings();
    }

    #[test]
    fn get_settings_returns_arc_for_snapshot_isolation() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        init_settings(WardSettings::default());

        let snapshot = get_settings();
        assert_eq!(snapshot.logging.level, "info");

        let mut new = WardSettings::default();
        new.logging.level = "debug".to_string();
        init_settings(new);

        // Snapshot still sees the old value; a fresh get sees the new one
        assert_eq!(snapshot.logging.level, "info");
        assert_eq!(get_settings().logging.level, "debug");

        reset_settings();
    }
}

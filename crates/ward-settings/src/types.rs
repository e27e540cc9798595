//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial settings file is valid: missing fields take their production
//! default values during deserialization.

use serde::{Deserialize, Serialize};

/// Root settings type for the Ward assistant.
///
/// Loaded from `~/.ward/settings.json` with defaults applied for missing
/// fields. Specific values can be overridden via `WARD_*` environment
/// variables (see the loader).
///
/// # JSON Format
///
/// ```json
/// {
///   "version": "0.1.0",
///   "llm": { "deployment": "gpt-4o", "endpoint": "https://…" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WardSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Text-generation service settings (classifier + summarizer calls).
    pub llm: LlmSettings,
    /// Context engine settings (caps and heuristics).
    pub context: ContextSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for WardSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "ward".to_string(),
            llm: LlmSettings::default(),
            context: ContextSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl WardSettings {
    /// Correct nonsensical numeric values in place.
    ///
    /// Called automatically during loading. Out-of-range values are clamped
    /// with a warning rather than rejected, so users get corrected behavior
    /// instead of a confusing startup error.
    pub fn validate(&mut self) {
        if self.context.chars_per_token == 0 {
            tracing::warn!("context.charsPerToken must be positive, correcting to 4");
            self.context.chars_per_token = 4;
        }
        if self.context.history_char_cap == 0 {
            tracing::warn!("context.historyCharCap must be positive, correcting to 8000");
            self.context.history_char_cap = 8000;
        }
        if self.llm.classify_max_tokens == 0 {
            tracing::warn!("llm.classifyMaxTokens must be positive, correcting to 200");
            self.llm.classify_max_tokens = 200;
        }
        if self.llm.summary_max_tokens == 0 {
            tracing::warn!("llm.summaryMaxTokens must be positive, correcting to 200");
            self.llm.summary_max_tokens = 200;
        }
    }
}

/// Text-generation service settings.
///
/// One deployment serves both the context classifier and the summarizer;
/// both calls run at zero temperature with small output budgets.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Service base endpoint (e.g. `https://myresource.openai.azure.com`).
    pub endpoint: String,
    /// Chat-completions deployment name.
    pub deployment: String,
    /// Service API version.
    pub api_version: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Output token budget for one classification call.
    pub classify_max_tokens: u32,
    /// Output token budget for one summarization call.
    pub summary_max_tokens: u32,
    /// Optional path to an external classifier ruleset file.
    ///
    /// When unset, the compiled default ruleset is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: String::new(),
            api_version: "2024-10-21".to_string(),
            api_key_env: "WARD_LLM_API_KEY".to_string(),
            classify_max_tokens: 200,
            summary_max_tokens: 200,
            rules_path: None,
        }
    }
}

/// Context engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    /// Byte cap on the concatenated transcript history sent to the
    /// summarizer.
    pub history_char_cap: usize,
    /// Bytes per token for the cheap token-count heuristic.
    pub chars_per_token: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            history_char_cap: 8000,
            chars_per_token: 4,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

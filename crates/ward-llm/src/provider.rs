//! Chat-completion provider trait.
//!
//! The analyzer needs exactly one capability from a text-generation
//! service: send a system prompt plus one user message, get one bounded
//! completion back. [`ChatCompletion`] is that seam; [`crate::azure`]
//! implements it for Azure OpenAI, and tests implement it with fakes.

use async_trait::async_trait;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur during provider operations.
///
/// No automatic retries: callers fail soft to degraded values instead.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication failed (missing or rejected key).
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Service returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Whether a later retry could succeed.
        retryable: bool,
    },

    /// Service returned no usable completion content.
    #[error("empty completion response")]
    EmptyResponse,

    /// Provider-specific error.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Api { retryable, .. } => *retryable,
            Self::Json(_) | Self::Auth { .. } | Self::EmptyResponse | Self::Other { .. } => false,
        }
    }

    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Auth { .. } => "auth",
            Self::Api { .. } => "api",
            Self::EmptyResponse => "empty",
            Self::Other { .. } => "unknown",
        }
    }
}

/// One single-shot chat completion request.
///
/// Context-tracking calls are deterministic-leaning: zero temperature,
/// zero top-p, small output budget.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// System prompt.
    pub system: String,
    /// Single user message.
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Top-p sampling.
    pub top_p: f64,
    /// Constrain the response to a single JSON object.
    pub json_mode: bool,
}

impl ChatRequest {
    /// Create a deterministic (zero-sampling) request.
    #[must_use]
    pub fn deterministic(
        system: impl Into<String>,
        user: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens,
            temperature: 0.0,
            top_p: 0.0,
            json_mode: false,
        }
    }

    /// Enable JSON response mode.
    #[must_use]
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Single-shot chat completion capability.
///
/// Implementors must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Deployment/model identifier, for logging.
    fn model(&self) -> &str;

    /// Send one request and return the completion text.
    async fn complete(&self, request: &ChatRequest) -> ProviderResult<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Azure OpenAI chat-completions provider.
//!
//! Implements [`ChatCompletion`] against the Azure OpenAI REST surface:
//! `{endpoint}/openai/deployments/{deployment}/chat/completions` with an
//! `api-version` query parameter and an `api-key` header.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use ward_settings::WardSettings;

use crate::provider::{ChatCompletion, ChatRequest, ProviderError, ProviderResult};

/// Configuration for [`AzureChatProvider`].
#[derive(Clone, Debug)]
pub struct AzureChatConfig {
    /// Service base endpoint, without a trailing slash.
    pub endpoint: String,
    /// Chat-completions deployment name.
    pub deployment: String,
    /// Service API version.
    pub api_version: String,
    /// API key sent in the `api-key` header.
    pub api_key: String,
}

/// Azure OpenAI chat-completions provider.
#[derive(Debug)]
pub struct AzureChatProvider {
    config: AzureChatConfig,
    client: reqwest::Client,
}

impl AzureChatProvider {
    /// Create a new provider.
    #[must_use]
    pub fn new(config: AzureChatConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new provider with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: AzureChatConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Build a provider from settings.
    ///
    /// The API key is read from the environment variable named by
    /// `llm.api_key_env`. Errors when the endpoint, deployment, or key is
    /// missing; a provider that cannot authenticate is a configuration
    /// fault, not a per-turn degradation.
    pub fn from_settings(settings: &WardSettings) -> ProviderResult<Self> {
        if settings.llm.endpoint.is_empty() {
            return Err(ProviderError::Other {
                message: "llm.endpoint is not configured".into(),
            });
        }
        if settings.llm.deployment.is_empty() {
            return Err(ProviderError::Other {
                message: "llm.deployment is not configured".into(),
            });
        }
        let api_key = std::env::var(&settings.llm.api_key_env).map_err(|_| {
            ProviderError::Auth {
                message: format!("API key env var {} is not set", settings.llm.api_key_env),
            }
        })?;
        Ok(Self::new(AzureChatConfig {
            endpoint: settings.llm.endpoint.trim_end_matches('/').to_owned(),
            deployment: settings.llm.deployment.clone(),
            api_version: settings.llm.api_version.clone(),
            api_key,
        }))
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }
}

#[async_trait]
impl ChatCompletion for AzureChatProvider {
    fn model(&self) -> &str {
        &self.config.deployment
    }

    async fn complete(&self, request: &ChatRequest) -> ProviderResult<String> {
        let mut body = json!({
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "top_p": request.top_p,
            "max_tokens": request.max_tokens,
        });
        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        debug!(
            deployment = %self.config.deployment,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion call finished"
        );

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let code = status.as_u16();
            return Err(match code {
                401 | 403 => ProviderError::Auth { message },
                _ => ProviderError::Api {
                    status: code,
                    message,
                    retryable: code == 429 || code >= 500,
                },
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        let content = content.trim();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(content.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

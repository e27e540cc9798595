//! # ward-llm
//!
//! Text-generation integration for the Ward context engine.
//!
//! Two layers:
//!
//! - [`provider`]: the [`provider::ChatCompletion`] trait for single-shot
//!   chat completions, plus the Azure OpenAI implementation in [`azure`]
//! - [`analyzer`]: the [`analyzer::Classifier`] and [`analyzer::Summarizer`]
//!   capability traits consumed by the context engine, implemented by
//!   [`analyzer::LlmContextAnalyzer`] on top of any provider
//!
//! Failure policy: analyzer calls never raise past their boundary. Any
//! transport, decode, or validation failure degrades to a well-formed
//! "no action" / "no digest" value; context tracking is best-effort and
//! must never block message delivery.

#![deny(unsafe_code)]

pub mod analyzer;
pub mod azure;
pub mod prompt;
pub mod provider;

pub use analyzer::{
    Action, AnalyzerLimits, Classification, Classifier, LlmContextAnalyzer, Summarizer,
};
pub use azure::{AzureChatConfig, AzureChatProvider};
pub use prompt::ClassifierRules;
pub use provider::{ChatCompletion, ChatRequest, ProviderError, ProviderResult};

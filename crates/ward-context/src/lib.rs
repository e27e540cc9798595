//! # ward-context
//!
//! The conversation patient-context engine.
//!
//! Turn by turn, this crate decides which clinical patient a multi-agent
//! chat is currently about, tracks every patient ever referenced in the
//! conversation, and maintains a single canonical state record embedded in
//! the transcript itself, so every downstream consumer observes the same
//! context without a side channel.
//!
//! - [`types`]: conversation/patient data model and the per-turn
//!   [`types::Decision`]
//! - [`record`]: codec for the synthetic context-record message
//! - [`engine`]: the state machine (classify → transition → digest → sync)
//! - [`sync`]: transcript synchronizer keeping the record unique and at
//!   index 0
//! - [`render`]: record consumer for reply rendering
//! - [`store`]: persistence accessor contract + in-memory implementation
//! - [`turn`]: per-conversation turn pipeline with single-writer gating
//!
//! Pipeline per turn: the channel layer hands raw user text to
//! [`turn::TurnProcessor`], which reads the context, runs
//! [`engine::ContextEngine::apply`], and writes the context back. The engine
//! is stateless; all state lives in the [`types::ConversationContext`].

#![deny(unsafe_code)]

pub mod constants;
pub mod engine;
pub mod record;
pub mod render;
pub mod store;
pub mod sync;
pub mod token_estimator;
pub mod turn;
pub mod types;

pub use engine::{ContextEngine, EngineLimits};
pub use record::{ContextRecord, DecodedRecord};
pub use store::{ContextStore, InMemoryContextStore};
pub use turn::{TurnOutcome, TurnProcessor};
pub use types::{ConversationContext, Decision, PatientContext, Timing, TokenCounts};

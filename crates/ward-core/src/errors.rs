//! Error types shared across the Ward crates.
//!
//! Context tracking is best-effort: classifier and summarizer failures are
//! absorbed inside `ward-llm` and never surface as errors. What remains is
//! the persistence boundary, whose failures the caller must see.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Persistence accessor operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceOperation {
    /// Reading a conversation context.
    Read,
    /// Writing a conversation context.
    Write,
    /// Archiving a conversation context.
    Archive,
}

impl fmt::Display for PersistenceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// Conversation-context persistence error.
///
/// Surfaced to the caller: the in-memory decision for the turn still
/// completes, but durability is not guaranteed.
#[derive(Debug, Error)]
#[error("Persistence {operation} failed for {conversation_id}: {message}")]
pub struct PersistenceError {
    /// Conversation the operation targeted.
    pub conversation_id: String,
    /// Operation that failed.
    pub operation: PersistenceOperation,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable error code.
    pub code: String,
    /// Original cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PersistenceError {
    /// Create a new persistence error.
    #[must_use]
    pub fn new(
        conversation_id: impl Into<String>,
        operation: PersistenceOperation,
        message: impl Into<String>,
    ) -> Self {
        let op_upper = operation.to_string().to_uppercase();
        Self {
            conversation_id: conversation_id.into(),
            operation,
            message: message.into(),
            code: format!("PERSISTENCE_{op_upper}_ERROR"),
            source: None,
        }
    }

    /// Set the error cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Per-turn pipeline with single-writer gating.
//!
//! The data model has no lock of its own; correctness relies on at most one
//! turn mutating a conversation at a time. [`TurnGate`] enforces that here
//! rather than trusting every channel layer to serialize: one async mutex
//! per conversation, held across read → apply → write. Turns for different
//! conversations proceed concurrently.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::error;

use ward_core::errors::PersistenceError;
use ward_core::ids::ConversationId;

use crate::engine::ContextEngine;
use crate::store::ContextStore;
use crate::types::{Decision, Timing};

// ─────────────────────────────────────────────────────────────────────────────
// Turn gate
// ─────────────────────────────────────────────────────────────────────────────

/// Per-conversation turn serialization.
#[derive(Debug, Default)]
pub struct TurnGate {
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl TurnGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one conversation, waiting behind any turn
    /// already in flight for it.
    pub async fn acquire(&self, conversation_id: &ConversationId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(
            self.locks
                .entry(conversation_id.clone())
                .or_default()
                .value(),
        );
        lock.lock_owned().await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Turn processor
// ─────────────────────────────────────────────────────────────────────────────

/// Result of one processed turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The state machine's decision.
    pub decision: Decision,
    /// Classifier and total latency.
    pub timing: Timing,
    /// Set when the post-turn write failed. The in-memory decision above is
    /// still valid; durability is not guaranteed and the caller decides
    /// whether to notify the end user.
    pub persist_error: Option<PersistenceError>,
}

/// Composes the per-turn pipeline: gate → read → apply → write.
///
/// Apply mutates only the in-memory context; the trailing write is the
/// single commit point, so a turn cancelled mid-flight never leaves a
/// partially persisted transcript.
pub struct TurnProcessor {
    engine: ContextEngine,
    store: Arc<dyn ContextStore>,
    gate: TurnGate,
}

impl TurnProcessor {
    /// Create a processor over an engine and a store.
    #[must_use]
    pub fn new(engine: ContextEngine, store: Arc<dyn ContextStore>) -> Self {
        Self {
            engine,
            store,
            gate: TurnGate::new(),
        }
    }

    /// Process one turn of user text for a conversation.
    ///
    /// A read failure aborts the turn. A write failure does not: the
    /// decision still completes and the error is reported in the outcome.
    pub async fn process_turn(
        &self,
        conversation_id: &ConversationId,
        user_text: &str,
    ) -> Result<TurnOutcome, PersistenceError> {
        let _guard = self.gate.acquire(conversation_id).await;

        let mut context = self.store.read(conversation_id).await?;
        let (decision, timing) = self.engine.apply(user_text, &mut context).await;

        let persist_error = self.store.write(&context).await.err();
        if let Some(e) = &persist_error {
            error!(
                conversation_id = %conversation_id,
                error = %e,
                "failed to persist conversation context"
            );
        }

        Ok(TurnOutcome {
            decision,
            timing,
            persist_error,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

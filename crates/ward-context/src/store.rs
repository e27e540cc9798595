//! Persistence accessor contract.
//!
//! The engine reads the conversation context before each turn and writes it
//! back after; it does not implement durable storage itself. Hosts plug in
//! their own accessor (blob store, database) behind [`ContextStore`]. The
//! in-memory implementation here backs tests and local runs.

use async_trait::async_trait;
use dashmap::DashMap;

use ward_core::errors::PersistenceError;
use ward_core::ids::ConversationId;

use crate::types::ConversationContext;

/// Conversation-context persistence accessor.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Read the context for a conversation.
    ///
    /// An unknown conversation yields a fresh empty context (first turn),
    /// not an error.
    async fn read(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationContext, PersistenceError>;

    /// Persist the context after a turn.
    async fn write(&self, context: &ConversationContext) -> Result<(), PersistenceError>;

    /// Move the context out of the live set (channel-layer clear-all).
    ///
    /// The next `read` for the conversation starts fresh. Archiving an
    /// unknown conversation is a no-op.
    async fn archive(&self, conversation_id: &ConversationId) -> Result<(), PersistenceError>;
}

/// In-memory [`ContextStore`] for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    live: DashMap<ConversationId, ConversationContext>,
    archived: DashMap<ConversationId, Vec<ConversationContext>>,
}

impl InMemoryContextStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of archived snapshots for a conversation.
    #[must_use]
    pub fn archived_count(&self, conversation_id: &ConversationId) -> usize {
        self.archived
            .get(conversation_id)
            .map_or(0, |snapshots| snapshots.len())
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn read(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationContext, PersistenceError> {
        Ok(self
            .live
            .get(conversation_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| ConversationContext::new(conversation_id.clone())))
    }

    async fn write(&self, context: &ConversationContext) -> Result<(), PersistenceError> {
        let _ = self
            .live
            .insert(context.conversation_id.clone(), context.clone());
        Ok(())
    }

    async fn archive(&self, conversation_id: &ConversationId) -> Result<(), PersistenceError> {
        if let Some((id, context)) = self.live.remove(conversation_id) {
            self.archived.entry(id).or_default().push(context);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

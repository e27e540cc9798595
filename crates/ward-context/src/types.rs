//! Conversation context data model.
//!
//! One [`ConversationContext`] exists per conversation: created on the
//! first turn, mutated every turn, archived on an explicit clear-all from
//! the channel layer. All engine state lives here; the engine itself is
//! stateless.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use ward_core::ids::{ConversationId, PatientId};
use ward_core::transcript::Transcript;

// ─────────────────────────────────────────────────────────────────────────────
// Per-patient context
// ─────────────────────────────────────────────────────────────────────────────

/// Minimal per-patient context.
///
/// Created exactly once per distinct patient ID, the first time that ID is
/// activated; never deleted for the lifetime of the conversation. The fact
/// bag is a future expansion point (facts, summary, provenance) and is
/// empty at creation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    /// Canonical patient identifier.
    pub patient_id: PatientId,
    /// Open-ended fact bag; empty at creation.
    #[serde(default)]
    pub facts: Map<String, Value>,
}

impl PatientContext {
    /// Create a blank context for a patient.
    #[must_use]
    pub fn new(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            facts: Map::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation context
// ─────────────────────────────────────────────────────────────────────────────

/// All tracked state for one conversation.
///
/// The patient registry is an explicit insertion-ordered map: enumeration
/// order is a documented contract (first activation order), entries are
/// never removed, and activations never reorder existing entries. Clearing
/// the active pointer retains the registry so earlier patients can be
/// switched back to without re-extraction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Stable conversation identifier from the channel layer.
    pub conversation_id: ConversationId,
    /// Currently active patient; `None` means no patient is in focus.
    pub active_patient_id: Option<PatientId>,
    /// Every patient ever activated in this conversation, in first-activation
    /// order.
    pub patients: IndexMap<PatientId, PatientContext>,
    /// Ordered message history.
    pub transcript: Transcript,
}

impl ConversationContext {
    /// Create an empty context for a conversation (first turn).
    #[must_use]
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            active_patient_id: None,
            patients: IndexMap::new(),
            transcript: Transcript::new(),
        }
    }

    /// Ordered snapshot of the known patient IDs.
    #[must_use]
    pub fn known_patient_ids(&self) -> Vec<PatientId> {
        self.patients.keys().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-turn outputs
// ─────────────────────────────────────────────────────────────────────────────

/// The state machine's per-turn outcome.
///
/// Distinct from the classifier's raw action tag: the classifier proposes
/// an action, the state machine reports what actually happened. Not
/// persisted; returned to the caller for logging and UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// No context-relevant change (also the degraded-failure outcome).
    None,
    /// The active patient is already the named one.
    Unchanged,
    /// A new blank patient context was created and activated.
    NewBlank,
    /// The active pointer switched to an already-known patient.
    SwitchExisting,
    /// The active pointer was cleared; the registry is retained.
    Clear,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Unchanged => write!(f, "UNCHANGED"),
            Self::NewBlank => write!(f, "NEW_BLANK"),
            Self::SwitchExisting => write!(f, "SWITCH_EXISTING"),
            Self::Clear => write!(f, "CLEAR"),
        }
    }
}

/// Per-turn latency, in seconds rounded to 4 decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Classifier call latency.
    pub analyzer: f64,
    /// Total state-machine latency (classifier included).
    pub service: f64,
}

impl Timing {
    /// Build a timing record from raw durations.
    #[must_use]
    pub fn from_durations(analyzer: std::time::Duration, service: std::time::Duration) -> Self {
        Self {
            analyzer: round4(analyzer.as_secs_f64()),
            service: round4(service.as_secs_f64()),
        }
    }
}

fn round4(secs: f64) -> f64 {
    (secs * 10_000.0).round() / 10_000.0
}

/// Rough token-count estimates carried by the context record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    /// Estimate for the raw (pre-digest) history text.
    pub history_estimate: u32,
    /// Estimate for the digest; zero when no digest was produced.
    pub summary_estimate: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

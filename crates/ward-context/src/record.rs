//! Context record codec.
//!
//! The record is one synthetic system-role transcript message: a fixed,
//! versioned marker followed by one compact JSON object. Encoding always
//! produces a single line. Decoding is tolerant: an absent record, and a
//! record whose body no longer parses, are both normal outcomes a consumer
//! must handle without failing the turn.

use serde::{Deserialize, Serialize};

use ward_core::ids::{ConversationId, PatientId};
use ward_core::transcript::{Role, Transcript, TranscriptMessage};

use crate::constants::RECORD_MARKER;
use crate::types::{Timing, TokenCounts};

/// Snapshot of the conversation context, embedded in the transcript.
///
/// Wire keys are fixed; `chat_summary` is serialized as `null` rather than
/// omitted so the key set is identical on every record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Conversation this record belongs to.
    pub conversation_id: ConversationId,
    /// Active patient; `null` only in records written by foreign tools
    /// (this engine removes the record instead).
    pub patient_id: Option<PatientId>,
    /// Every patient ever activated, in first-activation order.
    pub all_patient_ids: Vec<PatientId>,
    /// Per-turn latency.
    pub timing_sec: Timing,
    /// Bounded digest of the conversation so far.
    pub chat_summary: Option<String>,
    /// Rough token estimates for history and digest.
    pub token_counts: TokenCounts,
}

/// Result of decoding a transcript message as a context record.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedRecord {
    /// The message is not a context record.
    Absent,
    /// A well-formed record.
    Parsed(ContextRecord),
    /// Marker present but the body is not valid JSON; consumers fall back
    /// to treating this as an opaque display string.
    Raw(String),
}

/// Encode a record as single-line message content.
#[must_use]
pub fn encode_record(record: &ContextRecord) -> String {
    // This struct has no non-string map keys and only finite floats, so
    // serialization cannot fail; the fallback keeps the path total.
    let body = serde_json::to_string(record).unwrap_or_default();
    format!("{RECORD_MARKER} {body}")
}

/// Whether a message is a context record.
///
/// Requires the versioned marker as a strict prefix of the flat message
/// text, on a system-role message. Similar-looking content elsewhere in a
/// message, or on other roles, is not a record.
#[must_use]
pub fn is_record(message: &TranscriptMessage) -> bool {
    message.role == Role::System && message.text().starts_with(RECORD_MARKER)
}

/// Decode one message.
#[must_use]
pub fn decode_message(message: &TranscriptMessage) -> DecodedRecord {
    if message.role != Role::System {
        return DecodedRecord::Absent;
    }
    let text = message.text();
    let Some(rest) = text.strip_prefix(RECORD_MARKER) else {
        return DecodedRecord::Absent;
    };
    // Tolerate a stray second colon and surrounding whitespace.
    let body = rest.trim_start();
    let body = body.strip_prefix(':').unwrap_or(body).trim();
    match serde_json::from_str(body) {
        Ok(record) => DecodedRecord::Parsed(record),
        Err(_) => DecodedRecord::Raw(body.to_owned()),
    }
}

/// Find and decode the record in a transcript.
///
/// Returns the first match; the synchronizer guarantees at most one exists.
#[must_use]
pub fn find_record(transcript: &Transcript) -> DecodedRecord {
    for message in transcript.messages() {
        let decoded = decode_message(message);
        if decoded != DecodedRecord::Absent {
            return decoded;
        }
    }
    DecodedRecord::Absent
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

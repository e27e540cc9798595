//! Transcript synchronizer.
//!
//! Keeps the synthetic context record unique and at index 0. Invariants,
//! for any sequence of turns:
//!
//! - the transcript contains zero or exactly one record;
//! - when present, the record is at index 0;
//! - substantive messages are never altered, reordered, or dropped;
//! - re-running with unchanged inputs is a no-op on substantive messages.

use ward_core::transcript::{Transcript, TranscriptMessage};

use crate::record::{ContextRecord, encode_record, is_record};
use crate::types::{ConversationContext, Timing, TokenCounts};

/// Remove every context record from the transcript.
///
/// Idempotent; non-record messages keep their relative order.
pub fn remove_records(transcript: &mut Transcript) {
    transcript.retain(|message| !is_record(message));
}

/// Rewrite the context record to match the current context state.
///
/// Removes any stale record first, then inserts a fresh one at index 0
/// when a patient is active. No active patient leaves the transcript with
/// zero records.
pub fn sync_record(
    context: &mut ConversationContext,
    timing: &Timing,
    chat_summary: Option<&str>,
    token_counts: &TokenCounts,
) {
    remove_records(&mut context.transcript);

    let Some(active) = context.active_patient_id.clone() else {
        return;
    };

    let record = ContextRecord {
        conversation_id: context.conversation_id.clone(),
        patient_id: Some(active),
        all_patient_ids: context.known_patient_ids(),
        timing_sec: *timing,
        chat_summary: chat_summary.map(str::to_owned),
        token_counts: *token_counts,
    };
    context
        .transcript
        .insert_front(TranscriptMessage::system(encode_record(&record)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

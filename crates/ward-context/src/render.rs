//! Context record consumer for reply rendering.
//!
//! The reply renderer reads the record back out of the transcript and
//! appends a human-readable context block to an outgoing assistant message.
//! Tolerance contract: double invocation must not produce a second block,
//! and a malformed record body falls back to raw display rather than
//! failing the reply.

use crate::record::{DecodedRecord, find_record};

use ward_core::transcript::Transcript;

/// Heading line of the rendered context block; also the double-invocation
/// guard.
const CONTEXT_BLOCK_TAG: &str = "\n*Patient context:*";

/// Append the current context block to an outgoing reply.
///
/// Returns `base` unchanged when it already carries a context block or when
/// the transcript holds no record.
#[must_use]
pub fn append_context_block(base: &str, transcript: &Transcript) -> String {
    if base.contains(CONTEXT_BLOCK_TAG) {
        return base.to_owned();
    }

    match find_record(transcript) {
        DecodedRecord::Absent => base.to_owned(),
        DecodedRecord::Parsed(record) => {
            let mut lines: Vec<String> = Vec::new();
            if let Some(patient_id) = &record.patient_id {
                lines.push(format!("- **Patient ID:** `{patient_id}`"));
            }
            lines.push(format!(
                "- **Conversation ID:** `{}`",
                record.conversation_id
            ));
            if !record.all_patient_ids.is_empty() {
                let ids = record
                    .all_patient_ids
                    .iter()
                    .map(|id| {
                        if Some(id) == record.patient_id.as_ref() {
                            format!("`{id}` (active)")
                        } else {
                            format!("`{id}`")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("- **Session patients:** {ids}"));
            }
            if let Some(summary) = &record.chat_summary {
                let summary = summary.replace('\n', " ");
                let summary = summary.trim();
                if !summary.is_empty() {
                    lines.push(format!("- **Summary:** *{summary}*"));
                }
            }
            if record.patient_id.is_none() {
                lines.push("- *No active patient.*".to_string());
            }
            format!("{base}\n\n---{CONTEXT_BLOCK_TAG}\n{}", lines.join("\n"))
        }
        DecodedRecord::Raw(body) => {
            format!("{base}\n\n---{CONTEXT_BLOCK_TAG} (raw) `{body}`")
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

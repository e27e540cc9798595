//! Context engine constants.

/// Marker prefix identifying the synthetic context-record message.
///
/// Versioned: a future payload change bumps the suffix so stale records
/// from older writers are still recognized for removal by prefix scans but
/// never misparsed. Recognition requires a strict prefix match at the very
/// start of a system message's content.
pub const RECORD_MARKER: &str = "PATIENT_CONTEXT_JSON_V1:";

/// Digest placeholder when summarization fails.
pub const SUMMARY_UNAVAILABLE: &str = "Chat summary unavailable";

/// Default byte cap on concatenated transcript history sent to the
/// summarizer.
pub const DEFAULT_HISTORY_CHAR_CAP: usize = 8000;

/// Default bytes-per-token for the cheap token estimate.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Default output token budget for one summarization call.
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 200;

//! UTF-8-safe string truncation.
//!
//! Transcript history and summarizer input are capped by byte budget before
//! being sent to the text-generation service. `&s[..n]` panics when `n`
//! falls inside a multi-byte character, so truncation snaps back to the
//! nearest char boundary.

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
///
/// Returns the longest prefix of `s` whose byte length is at most
/// `max_bytes` and that does not split a multi-byte character.
#[inline]
#[must_use]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

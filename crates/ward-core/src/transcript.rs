//! Transcript model for multi-agent conversations.
//!
//! A [`Transcript`] is the ordered message history of one conversation.
//! Channel layers may deliver message bodies as a plain string or as a list
//! of structured parts, so [`MessageContent`] is a tagged variant with a
//! single [`MessageContent::flat_text`] extraction. Consumers never branch
//! on the runtime shape of a body.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Roles and content
// ─────────────────────────────────────────────────────────────────────────────

/// Author role of a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Synthetic or instructional messages.
    System,
    /// Messages from the end user.
    User,
    /// Messages produced by an assistant agent.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One part of a structured message body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    /// Text part.
    #[serde(rename = "text")]
    Text {
        /// The text.
        text: String,
    },
    /// Image part (base64-encoded). Contributes nothing to flat text.
    #[serde(rename = "image")]
    Image {
        /// Base64-encoded image data.
        data: String,
        /// MIME type (e.g. `image/png`).
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Message body: plain text or ordered structured parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// A plain string body.
    Text(String),
    /// An ordered list of structured parts.
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Extract the body as one flat string.
    ///
    /// Plain text is borrowed; structured parts concatenate their text parts
    /// in order. Non-text parts are skipped.
    #[must_use]
    pub fn flat_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Parts(parts) => {
                let mut out = String::new();
                for part in parts {
                    if let ContentPart::Text { text } = part {
                        out.push_str(text);
                    }
                }
                Cow::Owned(out)
            }
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// A single transcript message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Author role.
    pub role: Role,
    /// Message body.
    pub content: MessageContent,
}

impl TranscriptMessage {
    /// Create a system message with a plain-text body.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a user message with a plain-text body.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create an assistant message with a plain-text body.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Flat-text view of the body. See [`MessageContent::flat_text`].
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        self.content.flat_text()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transcript
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered message history of one conversation.
///
/// Append-only for substantive messages; the context engine additionally
/// removes and reinserts its single synthetic record message at the front.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<TranscriptMessage>,
}

impl Transcript {
    /// Create a new empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end.
    pub fn push(&mut self, message: TranscriptMessage) {
        self.messages.push(message);
    }

    /// Insert a message at index 0, shifting all other messages.
    pub fn insert_front(&mut self, message: TranscriptMessage) {
        self.messages.insert(0, message);
    }

    /// Keep only the messages matching the predicate, preserving order.
    pub fn retain(&mut self, f: impl FnMut(&TranscriptMessage) -> bool) {
        self.messages.retain(f);
    }

    /// View the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the transcript has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── flat_text ────────────────────────────────────────────────────────

    #[test]
    fn flat_text_plain_borrows() {
        let content = MessageContent::Text("hello".into());
        assert!(matches!(content.flat_text(), Cow::Borrowed("hello")));
    }

    #[test]
    fn flat_text_parts_concatenates_in_order() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "one ".into() },
            ContentPart::Text { text: "two".into() },
        ]);
        assert_eq!(content.flat_text(), "one two");
    }

    #[test]
    fn flat_text_skips_non_text_parts() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "scan: ".into() },
            ContentPart::Image {
                data: "aGk=".into(),
                mime_type: "image/png".into(),
            },
            ContentPart::Text { text: "attached".into() },
        ]);
        assert_eq!(content.flat_text(), "scan: attached");
    }

    #[test]
    fn flat_text_empty_parts() {
        let content = MessageContent::Parts(Vec::new());
        assert_eq!(content.flat_text(), "");
    }

    // ── serde ────────────────────────────────────────────────────────────

    #[test]
    fn content_deserializes_from_plain_string() {
        let content: MessageContent = serde_json::from_str("\"hi there\"").unwrap();
        assert_eq!(content, MessageContent::Text("hi there".into()));
    }

    #[test]
    fn content_deserializes_from_parts_array() {
        let json = r#"[{"type":"text","text":"hi"}]"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.flat_text(), "hi");
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = TranscriptMessage::user("how is patient_5 doing?");
        let json = serde_json::to_string(&msg).unwrap();
        let back: TranscriptMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    // ── transcript ───────────────────────────────────────────────────────

    #[test]
    fn push_preserves_order() {
        let mut t = Transcript::new();
        t.push(TranscriptMessage::user("first"));
        t.push(TranscriptMessage::assistant("second"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].text(), "first");
        assert_eq!(t.messages()[1].text(), "second");
    }

    #[test]
    fn insert_front_shifts_messages() {
        let mut t = Transcript::new();
        t.push(TranscriptMessage::user("existing"));
        t.insert_front(TranscriptMessage::system("injected"));
        assert_eq!(t.messages()[0].role, Role::System);
        assert_eq!(t.messages()[1].text(), "existing");
    }

    #[test]
    fn retain_keeps_order() {
        let mut t = Transcript::new();
        t.push(TranscriptMessage::system("drop me"));
        t.push(TranscriptMessage::user("keep 1"));
        t.push(TranscriptMessage::assistant("keep 2"));
        t.retain(|m| m.role != Role::System);
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].text(), "keep 1");
        assert_eq!(t.messages()[1].text(), "keep 2");
    }

    #[test]
    fn empty_transcript() {
        let t = Transcript::new();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}

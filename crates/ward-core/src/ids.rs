//! Branded ID newtypes.
//!
//! Conversation and patient identifiers are both opaque strings on the wire.
//! Wrapping each in its own newtype prevents passing one where the other is
//! expected. Channel layers hand us conversation IDs verbatim; patient IDs
//! are produced by the context classifier in canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Stable identifier of one conversation, assigned by the channel layer.
    ConversationId
}

branded_id! {
    /// Canonical identifier of one clinical patient (e.g. `patient_5`).
    PatientId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_uuid_v7() {
        let id = ConversationId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(PatientId::new(), PatientId::new());
    }

    #[test]
    fn from_str_ref() {
        let id = PatientId::from("patient_5");
        assert_eq!(id.as_str(), "patient_5");
    }

    #[test]
    fn display_and_into_string() {
        let id = ConversationId::from("conv-1");
        assert_eq!(format!("{id}"), "conv-1");
        let s: String = id.into();
        assert_eq!(s, "conv-1");
    }

    #[test]
    fn serde_is_transparent() {
        let id = PatientId::from("patient_6");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"patient_6\"");
        let back: PatientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn hash_and_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let id = PatientId::from("patient_5");
        let _ = set.insert(id.clone());
        let _ = set.insert(id);
        assert_eq!(set.len(), 1);
    }
}

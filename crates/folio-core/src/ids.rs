//! Branded ID newtypes for type safety.
//!
//! Every identifier in the data layer has a distinct type implemented as a
//! newtype wrapper around `String`. This prevents accidentally passing a
//! record ID where an event ID is expected.
//!
//! Generated IDs are ULIDs: 26 characters of Crockford base32, sortable by
//! creation time. [`NodeId`] is operator-assigned and carries no format.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

/// Length of every generated identifier.
pub const ULID_LEN: usize = 26;

/// An identifier string failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}': expected a {ULID_LEN}-character ULID")]
pub struct InvalidId {
    /// Which identifier type rejected the value.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Generate a new ULID string.
fn new_ulid() -> String {
    Ulid::new().to_string()
}

/// Returns `true` if `s` is a well-formed ULID.
pub fn is_ulid(s: &str) -> bool {
    s.len() == ULID_LEN && Ulid::from_string(s).is_ok()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value without validation.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
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

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
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

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident => $kind:literal) => {
        branded_id! {
            $(#[$meta])*
            $name
        }

        impl $name {
            /// Create a new random ID (ULID, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_ulid())
            }

            /// Parse and validate an existing ULID string.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                if is_ulid(s) {
                    Ok(Self(s.to_owned()))
                } else {
                    Err(InvalidId {
                        kind: $kind,
                        value: s.to_owned(),
                    })
                }
            }

            /// Whether the wrapped value is a well-formed ULID.
            #[must_use]
            pub fn is_valid(&self) -> bool {
                is_ulid(&self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

ulid_id! {
    /// Unique identifier for a change event (primary key of the log).
    EventId => "event id"
}

ulid_id! {
    /// Identifier of a mutated entity row. Fixed-length and sortable.
    RecordId => "record id"
}

ulid_id! {
    /// Identifier of the user who performed a mutation.
    UserId => "user id"
}

branded_id! {
    /// Identifier of the node that performed a mutation.
    NodeId
}

impl NodeId {
    /// Generate a random node ID for nodes without a configured one.
    #[must_use]
    pub fn generate() -> Self {
        Self(new_ulid())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_ulids() {
        let id = RecordId::new();
        assert_eq!(id.len(), ULID_LEN);
        assert!(id.is_valid());
        assert!(EventId::new().is_valid());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_accepts_ulid() {
        let raw = Ulid::new().to_string();
        let id = RecordId::parse(&raw).unwrap();
        assert_eq!(id.as_str(), raw);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = RecordId::parse("too-short").unwrap_err();
        assert_eq!(err.kind, "record id");
        assert!(err.to_string().contains("26-character"));
    }

    #[test]
    fn parse_rejects_invalid_alphabet() {
        // 26 chars, but 'U' is outside Crockford base32
        assert!(RecordId::parse("UUUUUUUUUUUUUUUUUUUUUUUUUU").is_err());
    }

    #[test]
    fn from_string_skips_validation() {
        let id = RecordId::from_string("abc".into());
        assert!(!id.is_valid());
        assert_eq!(&*id, "abc");
    }

    #[test]
    fn serde_is_transparent() {
        let id = NodeId::from("node-a");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"node-a\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let a = EventId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = EventId::new();
        assert!(a < b);
    }
}

//! Newtype wrappers for identifiers to ensure type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an id from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new random (UUID v4) id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }

            /// First `n` characters of the id, used in exported filenames.
            pub fn short(&self, n: usize) -> &str {
                match self.0.char_indices().nth(n) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
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
    };
}

define_id!(
    /// Unique identifier for a PRD.
    PrdId
);

define_id!(
    /// Unique identifier for a registered agent.
    AgentId
);

define_id!(
    /// Unique identifier for a Devin task.
    DevinTaskId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prd_id_generate() {
        let id1 = PrdId::generate();
        let id2 = PrdId::generate();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_id_display() {
        let id = AgentId::new("agent-123");
        assert_eq!(format!("{}", id), "agent-123");
    }

    #[test]
    fn test_short_id() {
        let id = DevinTaskId::new("0123456789abcdef");
        assert_eq!(id.short(8), "01234567");
        assert_eq!(DevinTaskId::new("abc").short(8), "abc");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PrdId::new("p-1")).unwrap();
        assert_eq!(json, "\"p-1\"");
    }
}

//! Type-safe identifier wrappers around opaque strings.
//!
//! Project ids are minted by whichever backend creates the project: the
//! remote store allocates them when the session is authenticated, the local
//! id generator when it is not. Neither side is a UUID authority, so the ids
//! are carried as opaque strings and never parsed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a project, shared by the local and remote stores.
    ProjectId
}

define_id! {
    /// Identifier of the user that owns a project on the remote store.
    OwnerId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_serializes_as_plain_string() {
        let id = ProjectId::new("abc123");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"abc123\""));
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = OwnerId::new("owner-1");
        let json = serde_json::to_string(&original).unwrap_or_default();
        let restored: Result<OwnerId, _> = serde_json::from_str(&json);
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn display_matches_inner() {
        let id = ProjectId::from("p-42");
        assert_eq!(id.to_string(), "p-42");
        assert_eq!(id.as_str(), "p-42");
    }
}

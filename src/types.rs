//! NewType wrappers for strong typing at the auth and ownership seams.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a post id where an identity id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Opaque identifier of an identity (user account).
    ///
    /// Generated app-side as a 32-character hex string so both storage
    /// backends expose the same id format. This is the value carried in the
    /// JWT `sub` claim and compared by the ownership guard.
    IdentityId
);

newtype_string!(
    /// Opaque identifier of a post.
    PostId
);

newtype_string!(
    /// Case-normalized email address (lowercased, trimmed).
    ///
    /// Unique across all identities. Construct via [`EmailAddress::normalized`]
    /// so lookups and the uniqueness index always see the same form.
    EmailAddress
);

impl EmailAddress {
    /// Normalize a raw email: trim surrounding whitespace and lowercase.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }
}

//! Newtype wrappers for the ids the backend issues.
//!
//! The backend uses opaque string ids (the JSON `_id` field). Wrapping them
//! keeps a post id from being passed where a trip id is expected.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a backend id.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// The id of a registered user.
    UserId
);
string_id!(
    /// The id of a travel inspiration post.
    PostId
);
string_id!(
    /// The id of a hosted trip.
    TripId
);
string_id!(
    /// The id of a comment on a post.
    CommentId
);

/// Prefix for ids fabricated locally before the backend assigns one.
pub(crate) const TEMPORARY_ID_PREFIX: &str = "temp-";

impl CommentId {
    /// Whether this id was created locally and not yet confirmed by the backend.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }
}

impl PostId {
    /// Whether this id was created locally and not yet confirmed by the backend.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a database row id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying row id.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Unique identifier for a bookmark.
    BookmarkId
);

record_id!(
    /// Unique identifier for a highlight.
    ///
    /// Replacing a highlight issues a new id, so callers should key on the
    /// verse location rather than holding on to this value.
    HighlightId
);

record_id!(
    /// Unique identifier for a note.
    NoteId
);

record_id!(
    /// Identifier of the reading-progress row.
    ProgressId
);

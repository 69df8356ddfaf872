use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::HighlightId;

/// A colour marking on a single verse.
///
/// At most one highlight exists per `(book_id, chapter, verse)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,
    pub book_id: u32,
    pub chapter: u32,
    pub verse: u32,
    /// Opaque colour tag, usually a hex value from the highlight palette.
    pub color_tag: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

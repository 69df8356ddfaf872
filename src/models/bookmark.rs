use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::BookmarkId;

/// A saved reading location.
///
/// Bookmarks are never edited; changing one means deleting it and adding a
/// new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub book_id: u32,
    pub chapter: u32,
    /// `None` marks the whole chapter.
    pub verse: Option<u32>,
    pub title: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

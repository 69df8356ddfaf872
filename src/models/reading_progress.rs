use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::ProgressId;

/// The device's current reading position.
///
/// Only one of these is kept; saving a new position overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub id: ProgressId,
    pub book_id: u32,
    pub chapter: u32,
    pub verse: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub last_read_at: OffsetDateTime,
}

impl ReadingProgress {
    /// Returns true when this record points at the given location.
    pub fn is_at(&self, book_id: u32, chapter: u32, verse: u32) -> bool {
        self.book_id == book_id && self.chapter == chapter && self.verse == verse
    }
}

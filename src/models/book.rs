use serde::{Deserialize, Serialize};
use std::fmt;

/// The two testaments of the canon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Testament {
    #[serde(rename = "OT")]
    Old,
    #[serde(rename = "NT")]
    New,
}

impl fmt::Display for Testament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Old => write!(f, "OT"),
            Self::New => write!(f, "NT"),
        }
    }
}

/// A book of the canon.
///
/// Books live in a static table and are handed out as `&'static Book`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Book {
    /// Canonical position, 1 (Genesis) through 66 (Revelation).
    pub id: u32,
    pub name: &'static str,
    /// Key of this book in the bundled corpus.
    pub abbreviation: &'static str,
    pub chapter_count: u32,
    pub testament: Testament,
}

impl Book {
    /// Returns true for books of the Old Testament.
    pub fn is_old_testament(&self) -> bool {
        self.testament == Testament::Old
    }

    /// Returns true when `chapter` is a valid chapter number for this book.
    pub fn has_chapter(&self, chapter: u32) -> bool {
        (1..=self.chapter_count).contains(&chapter)
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

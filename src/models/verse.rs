use serde::{Deserialize, Serialize};

/// A single verse of scripture, built on demand from the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub book_id: u32,
    pub chapter: u32,
    /// 1-based position within the chapter.
    pub verse: u32,
    pub text: String,
}

/// An ordered chapter of verses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub book_id: u32,
    pub chapter: u32,
    pub verses: Vec<Verse>,
}

impl Chapter {
    /// Looks up a verse by its number.
    pub fn verse(&self, number: u32) -> Option<&Verse> {
        number
            .checked_sub(1)
            .and_then(|index| self.verses.get(index as usize))
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::NoteId;

/// A user note, either anchored to a verse or freeform.
///
/// Tags keep the order the user entered them for display; lookups treat them
/// as a set. Images are kept as opaque encoded blobs in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub book_id: Option<u32>,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<Vec<u8>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_freeform: bool,
}

impl Note {
    /// Returns the `(book_id, chapter, verse)` this note is attached to, if any.
    pub fn anchor(&self) -> Option<(u32, u32, u32)> {
        match (self.book_id, self.chapter, self.verse) {
            (Some(book), Some(chapter), Some(verse)) => Some((book, chapter, verse)),
            _ => None,
        }
    }
}

/// Input for creating a note.
///
/// # Examples
///
/// ```
/// use lamp::NewNote;
///
/// let note = NewNote::at_verse(43, 3, 16, "John 3:16", "For God so loved")
///     .tags(["Insight", "Gratitude"]);
/// assert!(!note.is_freeform);
/// assert_eq!(note.tags.len(), 2);
///
/// let journal = NewNote::freeform("Morning", "Quiet time notes");
/// assert!(journal.is_freeform);
/// assert_eq!(journal.book_id, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub book_id: Option<u32>,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<Vec<u8>>,
    pub is_freeform: bool,
}

impl NewNote {
    /// A note attached to a verse.
    pub fn at_verse(
        book_id: u32,
        chapter: u32,
        verse: u32,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            book_id: Some(book_id),
            chapter: Some(chapter),
            verse: Some(verse),
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// A journal entry with no scripture anchor.
    pub fn freeform(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            is_freeform: true,
            ..Self::default()
        }
    }

    /// Sets the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the image blobs.
    pub fn images(mut self, images: Vec<Vec<u8>>) -> Self {
        self.images = images;
        self
    }
}

/// Builder for assembling a `Note` from stored parts.
#[derive(Debug, Default)]
pub struct NoteBuilder {
    id: Option<NoteId>,
    book_id: Option<u32>,
    chapter: Option<u32>,
    verse: Option<u32>,
    title: String,
    content: String,
    tags: Vec<String>,
    images: Vec<Vec<u8>>,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
    is_freeform: bool,
}

impl NoteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the location fields independently; any of them may be absent.
    pub fn location(mut self, book_id: Option<u32>, chapter: Option<u32>, verse: Option<u32>) -> Self {
        self.book_id = book_id;
        self.chapter = chapter;
        self.verse = verse;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn images(mut self, images: Vec<Vec<u8>>) -> Self {
        self.images = images;
        self
    }

    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn freeform(mut self, is_freeform: bool) -> Self {
        self.is_freeform = is_freeform;
        self
    }

    /// Builds the `Note`. Missing timestamps default to now.
    ///
    /// # Panics
    ///
    /// Panics if `id` has not been set.
    pub fn build(self) -> Note {
        let now = OffsetDateTime::now_utc();
        Note {
            id: self.id.expect("id is required"),
            book_id: self.book_id,
            chapter: self.chapter,
            verse: self.verse,
            title: self.title,
            content: self.content,
            tags: self.tags,
            images: self.images,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
            is_freeform: self.is_freeform,
        }
    }
}

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use time::OffsetDateTime;
use tracing::debug;

use crate::db::{from_millis, to_millis};
use crate::error::StoreError;
use crate::{
    Bookmark, BookmarkId, Database, Highlight, HighlightId, NewNote, Note, NoteBuilder, NoteId,
    ProgressId, ReadingProgress,
};

/// Durable storage for bookmarks, highlights, notes, and reading progress.
///
/// Every call persists immediately; there is no batching and no transaction
/// spans more than one call. Lookups that find nothing return `None` or an
/// empty collection rather than an error.
///
/// The store owns a single SQLite connection and is meant to be used from one
/// thread.
///
/// # Examples
///
/// ```
/// use lamp::AnnotationStore;
///
/// # fn main() -> Result<(), lamp::StoreError> {
/// let store = AnnotationStore::in_memory()?;
///
/// store.set_highlight(43, 3, 16, "FFCDD2")?;
/// store.set_highlight(43, 3, 16, "B3E5FC")?;
///
/// let colours = store.list_highlights(43, 3)?;
/// assert_eq!(colours.len(), 1);
/// assert_eq!(colours[&16], "B3E5FC");
/// # Ok(())
/// # }
/// ```
pub struct AnnotationStore {
    db: Database,
    last_stamp: Cell<i64>,
}

impl AnnotationStore {
    /// Creates a store over an opened database.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            last_stamp: Cell::new(i64::MIN),
        }
    }

    /// Opens a store backed by an in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::in_memory()?))
    }

    /// Opens (or creates) a store backed by the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Current time in stored form, strictly increasing across calls so that
    /// records written back to back still sort in write order.
    fn stamp(&self) -> i64 {
        let now = to_millis(OffsetDateTime::now_utc());
        let stamp = now.max(self.last_stamp.get().saturating_add(1));
        self.last_stamp.set(stamp);
        stamp
    }

    // --- Bookmarks ---

    /// Adds a bookmark. Repeated calls for the same location add repeated
    /// bookmarks.
    pub fn add_bookmark(
        &self,
        book_id: u32,
        chapter: u32,
        verse: Option<u32>,
        title: Option<&str>,
    ) -> Result<Bookmark, StoreError> {
        let conn = self.db.connection();
        let now = self.stamp();

        conn.execute(
            "INSERT INTO bookmarks (book_id, chapter, verse, title, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![book_id, chapter, verse, title, now],
        )?;
        let id = BookmarkId::new(conn.last_insert_rowid());
        debug!(%id, book_id, chapter, ?verse, "bookmark added");

        Ok(Bookmark {
            id,
            book_id,
            chapter,
            verse,
            title: title.map(str::to_string),
            created_at: from_millis(now)?,
        })
    }

    /// Retrieves a bookmark by id.
    pub fn get_bookmark(&self, id: BookmarkId) -> Result<Option<Bookmark>, StoreError> {
        let bookmark = self
            .db
            .connection()
            .query_row(
                "SELECT id, book_id, chapter, verse, title, created_at FROM bookmarks WHERE id = ?1",
                [id.get()],
                bookmark_from_row,
            )
            .optional()?;
        Ok(bookmark)
    }

    /// Deletes a bookmark. Deleting a missing bookmark is not an error.
    pub fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StoreError> {
        self.db
            .connection()
            .execute("DELETE FROM bookmarks WHERE id = ?1", [id.get()])?;
        debug!(%id, "bookmark deleted");
        Ok(())
    }

    /// Lists all bookmarks, most recently created first.
    pub fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, book_id, chapter, verse, title, created_at
             FROM bookmarks
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], bookmark_from_row)?;

        let mut bookmarks = Vec::new();
        for row in rows {
            bookmarks.push(row?);
        }
        Ok(bookmarks)
    }

    // --- Highlights ---

    /// Highlights a verse, replacing any highlight already on it.
    ///
    /// The old record is deleted and a new one inserted in the same
    /// transaction, so the verse never carries two highlights.
    pub fn set_highlight(
        &self,
        book_id: u32,
        chapter: u32,
        verse: u32,
        color_tag: &str,
    ) -> Result<Highlight, StoreError> {
        let conn = self.db.connection();
        let now = self.stamp();

        let tx = conn.unchecked_transaction()?;
        let replaced = tx.execute(
            "DELETE FROM highlights WHERE book_id = ?1 AND chapter = ?2 AND verse = ?3",
            params![book_id, chapter, verse],
        )?;
        tx.execute(
            "INSERT INTO highlights (book_id, chapter, verse, color_tag, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![book_id, chapter, verse, color_tag, now],
        )?;
        let id = HighlightId::new(tx.last_insert_rowid());
        tx.commit()?;

        debug!(%id, book_id, chapter, verse, color_tag, replaced, "highlight set");
        Ok(Highlight {
            id,
            book_id,
            chapter,
            verse,
            color_tag: color_tag.to_string(),
            created_at: from_millis(now)?,
        })
    }

    /// Removes the highlight on a verse, if there is one.
    ///
    /// Returns whether a highlight was removed.
    pub fn clear_highlight(&self, book_id: u32, chapter: u32, verse: u32) -> Result<bool, StoreError> {
        let removed = self.db.connection().execute(
            "DELETE FROM highlights WHERE book_id = ?1 AND chapter = ?2 AND verse = ?3",
            params![book_id, chapter, verse],
        )?;
        Ok(removed > 0)
    }

    /// Returns the highlight on a verse.
    pub fn get_highlight(
        &self,
        book_id: u32,
        chapter: u32,
        verse: u32,
    ) -> Result<Option<Highlight>, StoreError> {
        let highlight = self
            .db
            .connection()
            .query_row(
                "SELECT id, book_id, chapter, verse, color_tag, created_at
                 FROM highlights
                 WHERE book_id = ?1 AND chapter = ?2 AND verse = ?3",
                params![book_id, chapter, verse],
                |row| {
                    Ok(Highlight {
                        id: HighlightId::new(row.get(0)?),
                        book_id: row.get(1)?,
                        chapter: row.get(2)?,
                        verse: row.get(3)?,
                        color_tag: row.get(4)?,
                        created_at: timestamp_column(row, 5)?,
                    })
                },
            )
            .optional()?;
        Ok(highlight)
    }

    /// Returns the colour tag of every highlighted verse in a chapter, keyed
    /// by verse number.
    pub fn list_highlights(
        &self,
        book_id: u32,
        chapter: u32,
    ) -> Result<BTreeMap<u32, String>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT verse, color_tag FROM highlights WHERE book_id = ?1 AND chapter = ?2",
        )?;
        let rows = stmt.query_map(params![book_id, chapter], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut highlights = BTreeMap::new();
        for row in rows {
            let (verse, color) = row?;
            highlights.insert(verse, color);
        }
        Ok(highlights)
    }

    // --- Notes ---

    /// Creates a note.
    ///
    /// Tags are stored as given, minus exact repeats. A freeform note is
    /// stored without a location even if one was supplied.
    pub fn add_note(&self, new: NewNote) -> Result<Note, StoreError> {
        let conn = self.db.connection();
        let now = self.stamp();
        let tags = distinct_tags(new.tags.as_slice());
        let (book_id, chapter, verse) = if new.is_freeform {
            (None, None, None)
        } else {
            (new.book_id, new.chapter, new.verse)
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO notes (book_id, chapter, verse, title, content, is_freeform, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                book_id,
                chapter,
                verse,
                new.title,
                new.content,
                new.is_freeform,
                now
            ],
        )?;
        let id = NoteId::new(tx.last_insert_rowid());
        write_tags(&tx, id, &tags)?;
        write_images(&tx, id, &new.images)?;
        tx.commit()?;

        debug!(%id, freeform = new.is_freeform, tags = tags.len(), "note added");
        let at = from_millis(now)?;
        Ok(NoteBuilder::new()
            .id(id)
            .location(book_id, chapter, verse)
            .title(new.title)
            .content(new.content)
            .tags(tags)
            .images(new.images)
            .created_at(at)
            .updated_at(at)
            .freeform(new.is_freeform)
            .build())
    }

    /// Retrieves a note with its tags and images.
    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>, StoreError> {
        let conn = self.db.connection();

        let row = conn
            .query_row(
                "SELECT book_id, chapter, verse, title, content, is_freeform, created_at, updated_at
                 FROM notes WHERE id = ?1",
                [id.get()],
                |row| {
                    Ok((
                        row.get::<_, Option<u32>>(0)?,
                        row.get::<_, Option<u32>>(1)?,
                        row.get::<_, Option<u32>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, bool>(5)?,
                        timestamp_column(row, 6)?,
                        timestamp_column(row, 7)?,
                    ))
                },
            )
            .optional()?;

        let Some((book_id, chapter, verse, title, content, is_freeform, created_at, updated_at)) = row
        else {
            return Ok(None);
        };

        let mut tag_stmt =
            conn.prepare("SELECT name FROM note_tags WHERE note_id = ?1 ORDER BY position")?;
        let mut tags = Vec::new();
        for tag in tag_stmt.query_map([id.get()], |row| row.get::<_, String>(0))? {
            tags.push(tag?);
        }

        let mut image_stmt =
            conn.prepare("SELECT data FROM note_images WHERE note_id = ?1 ORDER BY position")?;
        let mut images = Vec::new();
        for image in image_stmt.query_map([id.get()], |row| row.get::<_, Vec<u8>>(0))? {
            images.push(image?);
        }

        Ok(Some(
            NoteBuilder::new()
                .id(id)
                .location(book_id, chapter, verse)
                .title(title)
                .content(content)
                .tags(tags)
                .images(images)
                .created_at(created_at)
                .updated_at(updated_at)
                .freeform(is_freeform)
                .build(),
        ))
    }

    /// Edits a note's title, content, and tags, refreshing `updated_at`.
    ///
    /// Returns `None` if the note does not exist. Images and location are
    /// left untouched.
    pub fn update_note<S: AsRef<str>>(
        &self,
        id: NoteId,
        title: &str,
        content: &str,
        tags: &[S],
    ) -> Result<Option<Note>, StoreError> {
        let conn = self.db.connection();
        let now = self.stamp();
        let tags = distinct_tags(tags);

        let tx = conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, content, now, id.get()],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id.get()])?;
        write_tags(&tx, id, &tags)?;
        tx.commit()?;

        debug!(%id, "note updated");
        self.get_note(id)
    }

    /// Replaces a note's images, refreshing `updated_at`.
    ///
    /// Returns `None` if the note does not exist.
    pub fn set_note_images(
        &self,
        id: NoteId,
        images: &[Vec<u8>],
    ) -> Result<Option<Note>, StoreError> {
        let conn = self.db.connection();
        let now = self.stamp();

        let tx = conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE notes SET updated_at = ?1 WHERE id = ?2",
            params![now, id.get()],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        tx.execute("DELETE FROM note_images WHERE note_id = ?1", [id.get()])?;
        write_images(&tx, id, images)?;
        tx.commit()?;

        debug!(%id, images = images.len(), "note images replaced");
        self.get_note(id)
    }

    /// Deletes a note with its tags and images. Idempotent.
    pub fn delete_note(&self, id: NoteId) -> Result<(), StoreError> {
        self.db
            .connection()
            .execute("DELETE FROM notes WHERE id = ?1", [id.get()])?;
        debug!(%id, "note deleted");
        Ok(())
    }

    /// Lists all notes, most recently updated first.
    pub fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        self.notes_where("1 = 1", [])
    }

    /// Lists the notes attached to one verse, most recently updated first.
    pub fn list_notes_at(
        &self,
        book_id: u32,
        chapter: u32,
        verse: u32,
    ) -> Result<Vec<Note>, StoreError> {
        self.notes_where(
            "book_id = ?1 AND chapter = ?2 AND verse = ?3",
            [book_id, chapter, verse],
        )
    }

    /// Finds notes whose title or content contains `query`, ignoring case.
    ///
    /// A blank query matches nothing.
    pub fn search_notes(&self, query: &str) -> Result<Vec<Note>, StoreError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let needle = query.to_lowercase();
        let notes = self.list_notes()?;
        Ok(notes
            .into_iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Lists notes of one kind, optionally narrowed by a query that matches
    /// title, content, or any tag, ignoring case.
    ///
    /// A blank query is treated as no query.
    pub fn filter_notes(
        &self,
        filter: NoteFilter,
        query: Option<&str>,
    ) -> Result<Vec<Note>, StoreError> {
        let needle = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let notes = self.list_notes()?;
        Ok(notes
            .into_iter()
            .filter(|note| filter.matches(note))
            .filter(|note| match &needle {
                None => true,
                Some(needle) => {
                    note.title.to_lowercase().contains(needle)
                        || note.content.to_lowercase().contains(needle)
                        || note.tags.iter().any(|t| t.to_lowercase().contains(needle))
                }
            })
            .collect())
    }

    /// Returns the verse numbers in a chapter that have at least one note.
    pub fn noted_verses(&self, book_id: u32, chapter: u32) -> Result<BTreeSet<u32>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT verse FROM notes
             WHERE book_id = ?1 AND chapter = ?2 AND verse IS NOT NULL",
        )?;
        let rows = stmt.query_map(params![book_id, chapter], |row| row.get::<_, u32>(0))?;

        let mut verses = BTreeSet::new();
        for verse in rows {
            verses.insert(verse?);
        }
        Ok(verses)
    }

    fn notes_where<P: rusqlite::Params>(
        &self,
        condition: &str,
        params: P,
    ) -> Result<Vec<Note>, StoreError> {
        let conn = self.db.connection();
        let query = format!(
            "SELECT id FROM notes WHERE {condition} ORDER BY updated_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params, |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }

        let mut notes = Vec::new();
        for id in ids {
            if let Some(note) = self.get_note(NoteId::new(id))? {
                notes.push(note);
            }
        }
        Ok(notes)
    }

    // --- Reading progress ---

    /// Records the current reading position.
    ///
    /// Updates the existing progress row in place (the most recently read
    /// one, should several exist) or inserts the first one. Never adds a
    /// second row.
    pub fn save_reading_progress(
        &self,
        book_id: u32,
        chapter: u32,
        verse: u32,
    ) -> Result<ReadingProgress, StoreError> {
        let conn = self.db.connection();
        let now = self.stamp();

        let tx = conn.unchecked_transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM reading_progress ORDER BY last_read_at DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE reading_progress
                     SET book_id = ?1, chapter = ?2, verse = ?3, last_read_at = ?4
                     WHERE id = ?5",
                    params![book_id, chapter, verse, now, id],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO reading_progress (book_id, chapter, verse, last_read_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![book_id, chapter, verse, now],
                )?;
                tx.last_insert_rowid()
            }
        };
        tx.commit()?;

        debug!(book_id, chapter, verse, "reading progress saved");
        Ok(ReadingProgress {
            id: ProgressId::new(id),
            book_id,
            chapter,
            verse,
            last_read_at: from_millis(now)?,
        })
    }

    /// Returns the most recently saved reading position.
    pub fn load_last_reading_progress(&self) -> Result<Option<ReadingProgress>, StoreError> {
        let progress = self
            .db
            .connection()
            .query_row(
                "SELECT id, book_id, chapter, verse, last_read_at
                 FROM reading_progress
                 ORDER BY last_read_at DESC, id DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok(ReadingProgress {
                        id: ProgressId::new(row.get(0)?),
                        book_id: row.get(1)?,
                        chapter: row.get(2)?,
                        verse: row.get(3)?,
                        last_read_at: timestamp_column(row, 4)?,
                    })
                },
            )
            .optional()?;
        Ok(progress)
    }
}

fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: BookmarkId::new(row.get(0)?),
        book_id: row.get(1)?,
        chapter: row.get(2)?,
        verse: row.get(3)?,
        title: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

/// Reads a millisecond timestamp column, reporting out-of-range values as a
/// conversion failure on that column.
fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<OffsetDateTime> {
    let millis: i64 = row.get(index)?;
    from_millis(millis).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(err))
    })
}

/// Drops exact repeats, keeping first-occurrence order. Tags are otherwise
/// stored verbatim, so the reloaded set equals the saved one.
fn distinct_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref();
        if !distinct.iter().any(|kept| kept == tag) {
            distinct.push(tag.to_string());
        }
    }
    distinct
}

fn write_tags(conn: &rusqlite::Connection, id: NoteId, tags: &[String]) -> Result<(), StoreError> {
    let mut stmt =
        conn.prepare("INSERT INTO note_tags (note_id, position, name) VALUES (?1, ?2, ?3)")?;
    for (position, tag) in tags.iter().enumerate() {
        stmt.execute(params![id.get(), position as i64, tag])?;
    }
    Ok(())
}

fn write_images(
    conn: &rusqlite::Connection,
    id: NoteId,
    images: &[Vec<u8>],
) -> Result<(), StoreError> {
    let mut stmt =
        conn.prepare("INSERT INTO note_images (note_id, position, data) VALUES (?1, ?2, ?3)")?;
    for (position, image) in images.iter().enumerate() {
        stmt.execute(params![id.get(), position as i64, image])?;
    }
    Ok(())
}

/// Which notes to include when filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteFilter {
    /// Every note.
    #[default]
    All,
    /// Notes attached to scripture.
    Verse,
    /// Freeform journal entries.
    Freeform,
}

impl NoteFilter {
    /// Returns true if `note` belongs to this kind.
    pub fn matches(self, note: &Note) -> bool {
        match self {
            Self::All => true,
            Self::Verse => !note.is_freeform,
            Self::Freeform => note.is_freeform,
        }
    }
}

#[cfg(test)]
#[path = "store/tests.rs"]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::canon;
use crate::config::Config;
use crate::error::{PreferencesError, ReaderError, StoreError};
use crate::search::{SearchResults, SearchTicket, SearchWorker};
use crate::store::NoteFilter;
use crate::{
    AnnotationStore, Book, Bookmark, BookmarkId, Chapter, Corpus, Highlight, NewNote, Note,
    NoteId, Preferences, ReadingProgress, Verse,
};

/// Highlights and note markers for the verses of one chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterOverlay {
    pub highlights: BTreeMap<u32, String>,
    pub noted_verses: BTreeSet<u32>,
}

impl ChapterOverlay {
    /// Colour tag of a highlighted verse.
    pub fn highlight(&self, verse: u32) -> Option<&str> {
        self.highlights.get(&verse).map(String::as_str)
    }

    pub fn has_note(&self, verse: u32) -> bool {
        self.noted_verses.contains(&verse)
    }
}

/// The reading session: the one owner of the annotation store, plus the
/// corpus, the chapter on screen, and the last saved reading position.
///
/// Presentation code talks to this and nothing else. All methods are meant to
/// be called from a single thread; only searches run elsewhere.
///
/// # Examples
///
/// ```
/// use lamp::{AnnotationStore, Corpus, Reader};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let corpus = Corpus::from_json_str(
///     r#"{"Gen": [["In the beginning God created the heaven and the earth."]]}"#,
/// )?;
/// let mut reader = Reader::new(AnnotationStore::in_memory()?, corpus);
///
/// let chapter = reader.open_chapter(1, 1).expect("Genesis 1 is loaded");
/// assert_eq!(chapter.verses.len(), 1);
///
/// // Opening a chapter records it as the reading position.
/// let position = reader.last_reading_position().expect("position saved");
/// assert!(position.is_at(1, 1, 1));
/// # Ok(())
/// # }
/// ```
pub struct Reader {
    store: AnnotationStore,
    corpus: Arc<Corpus>,
    search: SearchWorker,
    preferences: Preferences,
    preferences_path: Option<PathBuf>,
    location: Option<(u32, u32)>,
    current_chapter: Option<Chapter>,
    last_reading_position: Option<ReadingProgress>,
}

impl Reader {
    /// Opens the reader from configuration.
    ///
    /// Failing to open the annotation store is the one fatal startup error.
    /// A missing corpus or preferences file is tolerated.
    pub fn open(config: &Config) -> Result<Self, ReaderError> {
        let store =
            AnnotationStore::open(&config.database_path).map_err(ReaderError::Initialization)?;
        let corpus = Corpus::from_path(&config.corpus_path);
        let preferences = Preferences::load(&config.preferences_path);

        info!(
            database = %config.database_path.display(),
            corpus = %config.corpus_path.display(),
            "reader opened"
        );
        Ok(Self::new(store, corpus)
            .with_preferences(preferences, Some(config.preferences_path.clone())))
    }

    /// Opens the reader with configuration taken from the environment.
    pub fn from_env() -> Result<Self, ReaderError> {
        let config = Config::from_env()?;
        Self::open(&config)
    }

    /// Creates a reader over an opened store and a corpus, restoring the last
    /// reading position.
    pub fn new(store: AnnotationStore, corpus: Corpus) -> Self {
        let corpus = Arc::new(corpus);
        let last_reading_position = match store.load_last_reading_progress() {
            Ok(progress) => progress,
            Err(err) => {
                warn!(error = %err, "could not load reading position");
                None
            }
        };

        Self {
            store,
            search: SearchWorker::new(Arc::clone(&corpus)),
            corpus,
            preferences: Preferences::default(),
            preferences_path: None,
            location: None,
            current_chapter: None,
            last_reading_position,
        }
    }

    /// Replaces the preferences, persisting later changes to `path` if given.
    pub fn with_preferences(mut self, preferences: Preferences, path: Option<PathBuf>) -> Self {
        self.preferences = preferences;
        self.preferences_path = path;
        self
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    // --- Books and chapters ---

    pub fn books(&self) -> &'static [Book] {
        canon::list_books()
    }

    pub fn find_book(&self, id: u32) -> Option<&'static Book> {
        canon::find_book(id)
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.current_chapter.as_ref()
    }

    /// `(book_id, chapter)` of the last navigation to a valid chapter, even
    /// if its text was unavailable.
    pub fn location(&self) -> Option<(u32, u32)> {
        self.location
    }

    pub fn last_reading_position(&self) -> Option<&ReadingProgress> {
        self.last_reading_position.as_ref()
    }

    /// Navigates to a chapter and records it as the reading position.
    ///
    /// The previous chapter is dropped first, so a miss leaves no chapter
    /// current. A failed progress save is logged and the cached position is
    /// left at its last saved value.
    pub fn open_chapter(&mut self, book_id: u32, chapter: u32) -> Option<&Chapter> {
        self.current_chapter = None;

        let valid = canon::find_book(book_id).is_some_and(|book| book.has_chapter(chapter));
        if !valid {
            debug!(book_id, chapter, "no such chapter");
            return None;
        }
        self.location = Some((book_id, chapter));
        self.current_chapter = self.corpus.load_chapter(book_id, chapter);

        if self.current_chapter.is_some() {
            match self.store.save_reading_progress(book_id, chapter, 1) {
                Ok(progress) => self.last_reading_position = Some(progress),
                Err(err) => warn!(book_id, chapter, error = %err, "failed to save reading position"),
            }
        }
        self.current_chapter.as_ref()
    }

    /// Opens the chapter of the last reading position, or Genesis 1.
    pub fn resume(&mut self) -> Option<&Chapter> {
        let (book_id, chapter) = self
            .last_reading_position
            .as_ref()
            .map_or((1, 1), |progress| (progress.book_id, progress.chapter));
        self.open_chapter(book_id, chapter)
    }

    /// Moves to the following chapter, continuing into the next book.
    pub fn next_chapter(&mut self) -> Option<&Chapter> {
        let (book_id, chapter) = self.location?;
        let (book_id, chapter) = canon::next_chapter(book_id, chapter)?;
        self.open_chapter(book_id, chapter)
    }

    /// Moves to the preceding chapter, continuing into the previous book.
    pub fn previous_chapter(&mut self) -> Option<&Chapter> {
        let (book_id, chapter) = self.location?;
        let (book_id, chapter) = canon::previous_chapter(book_id, chapter)?;
        self.open_chapter(book_id, chapter)
    }

    /// Annotation markers for the current chapter; empty when none is open.
    pub fn chapter_overlay(&self) -> Result<ChapterOverlay, StoreError> {
        let Some(chapter) = &self.current_chapter else {
            return Ok(ChapterOverlay::default());
        };
        Ok(ChapterOverlay {
            highlights: self.store.list_highlights(chapter.book_id, chapter.chapter)?,
            noted_verses: self.store.noted_verses(chapter.book_id, chapter.chapter)?,
        })
    }

    // --- Bookmarks ---

    pub fn add_bookmark(
        &self,
        book_id: u32,
        chapter: u32,
        verse: Option<u32>,
        title: Option<&str>,
    ) -> Result<Bookmark, StoreError> {
        self.store.add_bookmark(book_id, chapter, verse, title)
    }

    /// Bookmarks a verse, titled with its reference (e.g. `John 3:16`).
    pub fn bookmark_verse(&self, verse: &Verse) -> Result<Bookmark, StoreError> {
        let title = canon::reference(verse.book_id, verse.chapter, Some(verse.verse));
        self.store
            .add_bookmark(verse.book_id, verse.chapter, Some(verse.verse), Some(&title))
    }

    pub fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StoreError> {
        self.store.delete_bookmark(id)
    }

    pub fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StoreError> {
        self.store.list_bookmarks()
    }

    // --- Highlights ---

    pub fn set_highlight(
        &self,
        book_id: u32,
        chapter: u32,
        verse: u32,
        color_tag: &str,
    ) -> Result<Highlight, StoreError> {
        self.store.set_highlight(book_id, chapter, verse, color_tag)
    }

    pub fn clear_highlight(&self, book_id: u32, chapter: u32, verse: u32) -> Result<bool, StoreError> {
        self.store.clear_highlight(book_id, chapter, verse)
    }

    pub fn list_highlights(
        &self,
        book_id: u32,
        chapter: u32,
    ) -> Result<BTreeMap<u32, String>, StoreError> {
        self.store.list_highlights(book_id, chapter)
    }

    // --- Notes ---

    pub fn add_note(&self, note: NewNote) -> Result<Note, StoreError> {
        self.store.add_note(note)
    }

    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>, StoreError> {
        self.store.get_note(id)
    }

    pub fn update_note<S: AsRef<str>>(
        &self,
        id: NoteId,
        title: &str,
        content: &str,
        tags: &[S],
    ) -> Result<Option<Note>, StoreError> {
        self.store.update_note(id, title, content, tags)
    }

    pub fn set_note_images(&self, id: NoteId, images: &[Vec<u8>]) -> Result<Option<Note>, StoreError> {
        self.store.set_note_images(id, images)
    }

    pub fn delete_note(&self, id: NoteId) -> Result<(), StoreError> {
        self.store.delete_note(id)
    }

    pub fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        self.store.list_notes()
    }

    pub fn list_notes_at(&self, book_id: u32, chapter: u32, verse: u32) -> Result<Vec<Note>, StoreError> {
        self.store.list_notes_at(book_id, chapter, verse)
    }

    pub fn search_notes(&self, query: &str) -> Result<Vec<Note>, StoreError> {
        self.store.search_notes(query)
    }

    pub fn filter_notes(&self, filter: NoteFilter, query: Option<&str>) -> Result<Vec<Note>, StoreError> {
        self.store.filter_notes(filter, query)
    }

    // --- Reading progress ---

    /// Saves a reading position, updating the cached one only on success.
    pub fn save_reading_progress(
        &mut self,
        book_id: u32,
        chapter: u32,
        verse: u32,
    ) -> Result<ReadingProgress, StoreError> {
        let progress = self.store.save_reading_progress(book_id, chapter, verse)?;
        self.last_reading_position = Some(progress.clone());
        Ok(progress)
    }

    /// Reloads the last reading position from the store.
    pub fn load_last_reading_progress(&mut self) -> Result<Option<ReadingProgress>, StoreError> {
        let progress = self.store.load_last_reading_progress()?;
        self.last_reading_position = progress.clone();
        Ok(progress)
    }

    // --- Search ---

    /// Searches on the calling thread and records the query.
    pub fn search(&mut self, query: &str) -> Vec<Verse> {
        self.remember_search(query);
        self.corpus.search(query)
    }

    /// Starts a background search and records the query. Results from any
    /// earlier search that has not been collected yet are discarded.
    pub fn begin_search(&mut self, query: &str) -> SearchTicket {
        self.remember_search(query);
        self.search.submit(query)
    }

    /// Returns the latest search's results if they are ready.
    pub fn poll_search(&self) -> Option<SearchResults> {
        self.search.try_recv_latest()
    }

    /// Waits up to `timeout` for the latest search's results.
    pub fn wait_for_search(&self, timeout: Duration) -> Option<SearchResults> {
        self.search.recv_latest_timeout(timeout)
    }

    // --- Preferences ---

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Changes preferences and persists them.
    ///
    /// The in-memory change stands even if writing the file fails.
    pub fn update_preferences<F>(&mut self, change: F) -> Result<(), PreferencesError>
    where
        F: FnOnce(&mut Preferences) -> Result<(), PreferencesError>,
    {
        let mut updated = self.preferences.clone();
        change(&mut updated)?;
        self.preferences = updated;
        self.persist_preferences()
    }

    pub fn clear_recent_searches(&mut self) -> Result<(), PreferencesError> {
        self.preferences.clear_recent_searches();
        self.persist_preferences()
    }

    fn remember_search(&mut self, query: &str) {
        self.preferences.record_search(query);
        if let Err(err) = self.persist_preferences() {
            warn!(error = %err, "failed to save recent searches");
        }
    }

    fn persist_preferences(&self) -> Result<(), PreferencesError> {
        match &self.preferences_path {
            Some(path) => self.preferences.save(path),
            None => Ok(()),
        }
    }
}

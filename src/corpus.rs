//! Verse corpus loader.
//!
//! The bundled dataset is a JSON object keyed by book abbreviation, holding an
//! ordered list of chapters, each an ordered list of verse strings. Verse
//! numbers are not stored; a verse's number is its 1-based position.
//!
//! A missing or malformed dataset is never fatal here: chapter lookups return
//! `None` and searches return nothing. The parsed dataset is cached after the
//! first successful load, and a failed load is retried on the next call.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::canon::{self, BOOKS};
use crate::error::CorpusError;
use crate::models::{Chapter, Verse};

/// Hard cap on the number of verses a search returns.
pub const SEARCH_LIMIT: usize = 100;

/// Raw corpus layout: abbreviation → chapters → verse texts.
pub type BibleText = HashMap<String, Vec<Vec<String>>>;

/// Read-only access to the scripture text.
///
/// `Corpus` is `Send + Sync`; share it behind an `Arc` to search from a
/// background thread.
#[derive(Debug)]
pub struct Corpus {
    source: Option<PathBuf>,
    cache: Mutex<Option<Arc<BibleText>>>,
}

impl Corpus {
    /// Creates a corpus backed by a JSON file. Nothing is read until first use.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            cache: Mutex::new(None),
        }
    }

    /// Creates a corpus over an already-parsed dataset.
    pub fn from_books(text: BibleText) -> Self {
        Self {
            source: None,
            cache: Mutex::new(Some(Arc::new(text))),
        }
    }

    /// Parses a dataset from a JSON string.
    ///
    /// # Examples
    ///
    /// ```
    /// use lamp::Corpus;
    ///
    /// let corpus = Corpus::from_json_str(r#"{"Jude": [["Jude, the servant of Jesus Christ"]]}"#)?;
    /// let chapter = corpus.load_chapter(65, 1).expect("Jude 1 is present");
    /// assert_eq!(chapter.verses[0].verse, 1);
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_books(serde_json::from_str(json)?))
    }

    /// Creates a corpus with no text at all.
    pub fn empty() -> Self {
        Self {
            source: None,
            cache: Mutex::new(None),
        }
    }

    /// Returns the configured dataset path, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Loads the dataset now, reporting why it is unavailable.
    pub fn ensure_loaded(&self) -> Result<(), CorpusError> {
        let mut cache = self.lock_cache();
        if cache.is_some() {
            return Ok(());
        }
        let path = self.source.as_ref().ok_or(CorpusError::NoSource)?;
        *cache = Some(Arc::new(read_dataset(path)?));
        Ok(())
    }

    /// Returns true once the dataset is loaded or can be loaded.
    pub fn is_available(&self) -> bool {
        self.text().is_some()
    }

    /// Loads one chapter.
    ///
    /// Returns `None` for an unknown book, a chapter outside
    /// `1..=chapter_count`, a chapter missing from the dataset, or an
    /// unavailable dataset.
    pub fn load_chapter(&self, book_id: u32, chapter: u32) -> Option<Chapter> {
        let book = canon::find_book(book_id)?;
        if !book.has_chapter(chapter) {
            return None;
        }
        let text = self.text()?;
        let texts = text.get(book.abbreviation)?.get(chapter as usize - 1)?;

        let verses = texts
            .iter()
            .enumerate()
            .map(|(index, text)| Verse {
                book_id,
                chapter,
                verse: index as u32 + 1,
                text: text.clone(),
            })
            .collect();

        Some(Chapter {
            book_id,
            chapter,
            verses,
        })
    }

    /// Looks up a single verse.
    pub fn verse(&self, book_id: u32, chapter: u32, verse: u32) -> Option<Verse> {
        let book = canon::find_book(book_id)?;
        if !book.has_chapter(chapter) || verse == 0 {
            return None;
        }
        let text = self.text()?;
        let verse_text = text
            .get(book.abbreviation)?
            .get(chapter as usize - 1)?
            .get(verse as usize - 1)?;
        Some(Verse {
            book_id,
            chapter,
            verse,
            text: verse_text.clone(),
        })
    }

    /// Case-insensitive substring search over every verse.
    ///
    /// Scans books in canonical order, then chapters, then verses, and stops
    /// as soon as [`SEARCH_LIMIT`] matches have been collected. A blank query
    /// matches nothing.
    pub fn search(&self, query: &str) -> Vec<Verse> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let Some(text) = self.text() else {
            return Vec::new();
        };

        let needle = query.to_lowercase();
        let mut results = Vec::new();

        'books: for book in BOOKS.iter() {
            let Some(chapters) = text.get(book.abbreviation) else {
                continue;
            };
            for (chapter_index, verses) in chapters.iter().enumerate() {
                for (verse_index, verse_text) in verses.iter().enumerate() {
                    if !verse_text.to_lowercase().contains(&needle) {
                        continue;
                    }
                    results.push(Verse {
                        book_id: book.id,
                        chapter: chapter_index as u32 + 1,
                        verse: verse_index as u32 + 1,
                        text: verse_text.clone(),
                    });
                    if results.len() >= SEARCH_LIMIT {
                        break 'books;
                    }
                }
            }
        }

        debug!(query, matches = results.len(), "corpus search finished");
        results
    }

    fn text(&self) -> Option<Arc<BibleText>> {
        let mut cache = self.lock_cache();
        if let Some(text) = cache.as_ref() {
            return Some(Arc::clone(text));
        }
        let path = self.source.as_ref()?;
        match read_dataset(path) {
            Ok(text) => {
                let text = Arc::new(text);
                *cache = Some(Arc::clone(&text));
                debug!(path = %path.display(), books = text.len(), "corpus loaded");
                Some(text)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "corpus unavailable");
                None
            }
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<Arc<BibleText>>> {
        // The cache holds plain data; a panic elsewhere cannot leave it half-written.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_dataset(path: &Path) -> Result<BibleText, CorpusError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Formats selected verses of a chapter as copyable text.
///
/// Each verse becomes a `"{number} {text}"` line, followed by a reference
/// line such as `— John 3:16,17 (KJV)`. Verse numbers are sorted and
/// de-duplicated; numbers not present in the chapter are skipped. Returns
/// `None` when nothing was selected.
pub fn passage_text(chapter: &Chapter, verses: &[u32]) -> Option<String> {
    let mut selected: Vec<u32> = verses.to_vec();
    selected.sort_unstable();
    selected.dedup();

    let found: Vec<&Verse> = selected
        .iter()
        .filter_map(|number| chapter.verse(*number))
        .collect();
    if found.is_empty() {
        return None;
    }

    let lines: Vec<String> = found
        .iter()
        .map(|verse| format!("{} {}", verse.verse, verse.text))
        .collect();
    let numbers: Vec<String> = found.iter().map(|verse| verse.verse.to_string()).collect();
    let name = match canon::find_book(chapter.book_id) {
        Some(book) => book.name.to_string(),
        None => format!("Book {}", chapter.book_id),
    };
    Some(format!(
        "{}\n— {} {}:{} (KJV)",
        lines.join("\n"),
        name,
        chapter.chapter,
        numbers.join(",")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Corpus {
        Corpus::from_json_str(
            r#"{
                "Gen": [["In the beginning God created the heaven and the earth.", "And the earth was without form"]],
                "John": [[], [], ["", "For God so loved the world"]],
                "1John": [[], [], [], ["Beloved, let us love one another", "He that loveth not knoweth not God"]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn verse_numbers_are_positions() {
        let chapter = sample().load_chapter(1, 1).unwrap();
        let numbers: Vec<u32> = chapter.verses.iter().map(|v| v.verse).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(chapter.verses[0].text.starts_with("In the beginning"));
    }

    #[test]
    fn chapter_out_of_range_is_none() {
        let corpus = sample();
        assert!(corpus.load_chapter(1, 0).is_none());
        assert!(corpus.load_chapter(1, 51).is_none());
        assert!(corpus.load_chapter(0, 1).is_none());
        assert!(corpus.load_chapter(67, 1).is_none());
    }

    #[test]
    fn chapter_bounds_hold_for_every_book() {
        // One chapter past the canonical count is present in the data, so
        // only the range check can reject it.
        let text: BibleText = canon::list_books()
            .iter()
            .map(|book| {
                let chapters = vec![vec!["text".to_string()]; book.chapter_count as usize + 1];
                (book.abbreviation.to_string(), chapters)
            })
            .collect();
        let corpus = Corpus::from_books(text);

        for book in canon::list_books() {
            assert!(corpus.load_chapter(book.id, 0).is_none(), "{} 0", book.name);
            assert!(
                corpus.load_chapter(book.id, book.chapter_count + 1).is_none(),
                "{} {}",
                book.name,
                book.chapter_count + 1
            );
            assert!(corpus.load_chapter(book.id, book.chapter_count).is_some());
            assert!(corpus.load_chapter(book.id, 1).is_some());
        }
    }

    #[test]
    fn chapter_missing_from_dataset_is_none() {
        // Genesis 2 is valid canonically but absent from the sample.
        assert!(sample().load_chapter(1, 2).is_none());
        // Exodus has no entry at all.
        assert!(sample().load_chapter(2, 1).is_none());
    }

    #[test]
    fn search_is_case_insensitive_and_ordered() {
        let results = sample().search("LOVE");
        let locations: Vec<(u32, u32, u32)> =
            results.iter().map(|v| (v.book_id, v.chapter, v.verse)).collect();
        assert_eq!(locations, vec![(43, 3, 2), (62, 4, 1), (62, 4, 2)]);
    }

    #[test]
    fn blank_query_matches_nothing() {
        assert!(sample().search("").is_empty());
        assert!(sample().search("   ").is_empty());
    }

    #[test]
    fn search_stops_at_global_limit() {
        let mut text = BibleText::new();
        text.insert("Gen".to_string(), vec![vec!["grace".to_string(); 60]; 2]);
        text.insert("Exod".to_string(), vec![vec!["grace".to_string(); 60]]);
        let corpus = Corpus::from_books(text);

        let results = corpus.search("grace");
        assert_eq!(results.len(), SEARCH_LIMIT);
        let last = results.last().unwrap();
        assert_eq!((last.book_id, last.chapter, last.verse), (1, 2, 40));
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let corpus = Corpus::from_path(dir.path().join("absent.json"));

        assert!(!corpus.is_available());
        assert!(corpus.load_chapter(1, 1).is_none());
        assert!(corpus.search("God").is_empty());
        assert!(matches!(corpus.ensure_loaded(), Err(CorpusError::Io(_))));
    }

    #[test]
    fn malformed_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kjv.json");
        fs::write(&path, "{ not json").unwrap();
        let corpus = Corpus::from_path(&path);

        assert!(corpus.load_chapter(1, 1).is_none());
        assert!(matches!(corpus.ensure_loaded(), Err(CorpusError::Json(_))));
    }

    #[test]
    fn failed_load_is_retried() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kjv.json");
        let corpus = Corpus::from_path(&path);
        assert!(corpus.load_chapter(65, 1).is_none());

        fs::write(&path, r#"{"Jude": [["Jude, the servant of Jesus Christ"]]}"#).unwrap();
        assert!(corpus.load_chapter(65, 1).is_some());

        // Cached: removing the file no longer matters.
        fs::remove_file(&path).unwrap();
        assert!(corpus.load_chapter(65, 1).is_some());
    }

    #[test]
    fn single_verse_lookup() {
        let corpus = sample();
        assert_eq!(
            corpus.verse(43, 3, 2).map(|v| v.text),
            Some("For God so loved the world".to_string())
        );
        assert!(corpus.verse(43, 3, 0).is_none());
        assert!(corpus.verse(43, 3, 9).is_none());
    }

    #[test]
    fn passage_text_sorts_and_adds_reference() {
        let chapter = sample().load_chapter(62, 4).unwrap();
        let text = passage_text(&chapter, &[2, 1, 2]).unwrap();
        assert_eq!(
            text,
            "1 Beloved, let us love one another\n2 He that loveth not knoweth not God\n— 1 John 4:1,2 (KJV)"
        );
        assert!(passage_text(&chapter, &[]).is_none());
        assert!(passage_text(&chapter, &[40]).is_none());
    }
}

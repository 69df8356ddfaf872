pub mod canon;
pub mod config;
pub mod corpus;
pub mod db;
pub mod error;
pub mod models;
pub mod preferences;
pub mod reader;
pub mod search;
pub mod store;
pub mod tags;

pub use config::Config;
pub use corpus::Corpus;
pub use db::Database;
pub use error::{ConfigError, CorpusError, PreferencesError, ReaderError, StoreError};
pub use models::{
    Book, Bookmark, BookmarkId, Chapter, Highlight, HighlightId, NewNote, Note, NoteBuilder,
    NoteId, ProgressId, ReadingProgress, Testament, Verse,
};
pub use preferences::{Preferences, Theme};
pub use reader::{ChapterOverlay, Reader};
pub use search::{SearchResults, SearchTicket};
pub use store::{AnnotationStore, NoteFilter};

//! Error types for the reading core.
//!
//! Lookup misses are not errors: chapters, books, and records that do not
//! exist come back as `None` or empty collections. The types here cover the
//! failures a caller has to decide about.

use thiserror::Error;

/// Errors raised by the annotation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected a statement or the connection failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A persisted timestamp could not be converted back to a date.
    #[error("Invalid stored timestamp: {0}")]
    Timestamp(#[from] time::error::ComponentRange),

    /// File system errors while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons the bundled corpus could not be loaded.
///
/// Reading operations never return this; they degrade to empty results. It is
/// exposed through `Corpus::ensure_loaded` so a caller can report why.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("No corpus file configured")]
    NoSource,

    #[error("Failed to read corpus file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed corpus file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while reading or writing preferences.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to access preferences file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed preferences: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid reminder time {hour:02}:{minute:02}")]
    InvalidReminderTime { hour: u8, minute: u8 },
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no per-user data directory and none was configured.
    #[error("Failed to determine data directory")]
    MissingDataDir,

    /// An environment variable holds an unusable value.
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Errors surfaced by the reader controller.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The annotation store could not be opened. The reader cannot run without it.
    #[error("Failed to open annotation store: {0}")]
    Initialization(#[source] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

//! Reader preferences: theme, typography, daily reminder, and recent searches.
//!
//! Stored as a small JSON document next to the annotation database. These
//! are conveniences; a missing or unreadable file yields the defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ensure_parent_directory;
use crate::error::PreferencesError;

/// Most recent searches kept.
pub const RECENT_SEARCH_LIMIT: usize = 10;

pub const DEFAULT_FONT_SIZE: f64 = 18.0;
pub const FONT_SIZE_RANGE: (f64, f64) = (14.0, 26.0);
pub const DEFAULT_LINE_SPACING: f64 = 8.0;
pub const LINE_SPACING_RANGE: (f64, f64) = (4.0, 16.0);

/// A named highlight colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightColor {
    pub name: &'static str,
    /// RGB hex without the leading `#`; used as the highlight colour tag.
    pub hex: &'static str,
}

/// Colours offered when highlighting a verse.
pub const HIGHLIGHT_PALETTE: [HighlightColor; 6] = [
    HighlightColor { name: "Blush", hex: "FFCDD2" },
    HighlightColor { name: "Peach", hex: "FFE0B2" },
    HighlightColor { name: "Lemon", hex: "FFF9C4" },
    HighlightColor { name: "Mint", hex: "C8E6C9" },
    HighlightColor { name: "Sky", hex: "B3E5FC" },
    HighlightColor { name: "Lilac", hex: "E1BEE7" },
];

/// Tags suggested in the note editor.
pub const SUGGESTED_TAGS: [&str; 8] = [
    "Insight",
    "Prayer",
    "Application",
    "Question",
    "Gratitude",
    "Praise",
    "Confession",
    "Resolution",
];

/// Looks up a palette colour by name, ignoring case.
pub fn palette_color(name: &str) -> Option<&'static HighlightColor> {
    HIGHLIGHT_PALETTE
        .iter()
        .find(|color| color.name.eq_ignore_ascii_case(name.trim()))
}

/// Colour theme identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    #[default]
    RoseGold,
    Lavender,
    Mint,
}

/// Daily reading reminder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 8,
            minute: 0,
        }
    }
}

/// All user preferences.
///
/// Unknown or missing fields in the stored document fall back to their
/// defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    font_size: f64,
    line_spacing: f64,
    pub reminder: Reminder,
    recent_searches: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_size: DEFAULT_FONT_SIZE,
            line_spacing: DEFAULT_LINE_SPACING,
            reminder: Reminder::default(),
            recent_searches: Vec::new(),
        }
    }
}

impl Preferences {
    /// Loads preferences from `path`.
    ///
    /// A missing file gives the defaults silently; an unreadable or malformed
    /// one gives the defaults with a warning.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Self::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "using default preferences");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Option<Self>, PreferencesError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut prefs: Self = serde_json::from_slice(&bytes)?;
        // Re-apply bounds in case the file was edited by hand.
        prefs.set_font_size(prefs.font_size);
        prefs.set_line_spacing(prefs.line_spacing);
        prefs.recent_searches.truncate(RECENT_SEARCH_LIMIT);
        Ok(Some(prefs))
    }

    /// Writes preferences to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        ensure_parent_directory(path)?;
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// Sets the reading font size, clamped to [`FONT_SIZE_RANGE`].
    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = clamp_or_default(size, FONT_SIZE_RANGE, DEFAULT_FONT_SIZE);
    }

    pub fn line_spacing(&self) -> f64 {
        self.line_spacing
    }

    /// Sets the line spacing, clamped to [`LINE_SPACING_RANGE`].
    pub fn set_line_spacing(&mut self, spacing: f64) {
        self.line_spacing = clamp_or_default(spacing, LINE_SPACING_RANGE, DEFAULT_LINE_SPACING);
    }

    /// Enables or disables the daily reminder at `hour:minute`.
    pub fn set_reminder(&mut self, enabled: bool, hour: u8, minute: u8) -> Result<(), PreferencesError> {
        if hour > 23 || minute > 59 {
            return Err(PreferencesError::InvalidReminderTime { hour, minute });
        }
        self.reminder = Reminder {
            enabled,
            hour,
            minute,
        };
        Ok(())
    }

    /// Recent searches, most recent first.
    pub fn recent_searches(&self) -> &[String] {
        &self.recent_searches
    }

    /// Puts `query` at the front of the recent searches.
    ///
    /// An earlier entry equal to it ignoring case is removed, and the list is
    /// capped at [`RECENT_SEARCH_LIMIT`]. Blank queries are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use lamp::Preferences;
    ///
    /// let mut prefs = Preferences::default();
    /// prefs.record_search("love");
    /// prefs.record_search("grace");
    /// prefs.record_search("LOVE");
    /// assert_eq!(prefs.recent_searches(), ["LOVE", "grace"]);
    /// ```
    pub fn record_search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let lowered = query.to_lowercase();
        self.recent_searches
            .retain(|existing| existing.to_lowercase() != lowered);
        self.recent_searches.insert(0, query.to_string());
        self.recent_searches.truncate(RECENT_SEARCH_LIMIT);
    }

    pub fn clear_recent_searches(&mut self) {
        self.recent_searches.clear();
    }
}

fn clamp_or_default(value: f64, (min, max): (f64, f64), default: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_reader_settings() {
        let prefs = Preferences::default();
        assert_eq!(prefs.theme, Theme::RoseGold);
        assert_eq!(prefs.font_size(), 18.0);
        assert_eq!(prefs.line_spacing(), 8.0);
        assert!(!prefs.reminder.enabled);
        assert_eq!((prefs.reminder.hour, prefs.reminder.minute), (8, 0));
        assert!(prefs.recent_searches().is_empty());
    }

    #[test]
    fn recent_searches_are_capped_at_ten() {
        let mut prefs = Preferences::default();
        for i in 0..15 {
            prefs.record_search(&format!("query {i}"));
        }
        assert_eq!(prefs.recent_searches().len(), RECENT_SEARCH_LIMIT);
        assert_eq!(prefs.recent_searches()[0], "query 14");
        assert_eq!(prefs.recent_searches()[9], "query 5");
    }

    #[test]
    fn recent_search_dedup_ignores_case_and_moves_to_front() {
        let mut prefs = Preferences::default();
        prefs.record_search("Faith");
        prefs.record_search("hope");
        prefs.record_search("faith");

        assert_eq!(prefs.recent_searches(), ["faith", "hope"]);
    }

    #[test]
    fn blank_search_is_not_recorded() {
        let mut prefs = Preferences::default();
        prefs.record_search("   ");
        assert!(prefs.recent_searches().is_empty());

        prefs.record_search("peace");
        prefs.clear_recent_searches();
        assert!(prefs.recent_searches().is_empty());
    }

    #[test]
    fn typography_is_clamped() {
        let mut prefs = Preferences::default();
        prefs.set_font_size(40.0);
        assert_eq!(prefs.font_size(), 26.0);
        prefs.set_font_size(2.0);
        assert_eq!(prefs.font_size(), 14.0);
        prefs.set_font_size(f64::NAN);
        assert_eq!(prefs.font_size(), DEFAULT_FONT_SIZE);

        prefs.set_line_spacing(100.0);
        assert_eq!(prefs.line_spacing(), 16.0);
    }

    #[test]
    fn reminder_time_is_validated() {
        let mut prefs = Preferences::default();
        assert!(prefs.set_reminder(true, 21, 30).is_ok());
        assert_eq!(prefs.reminder, Reminder { enabled: true, hour: 21, minute: 30 });

        let err = prefs.set_reminder(true, 24, 0).unwrap_err();
        assert!(matches!(err, PreferencesError::InvalidReminderTime { hour: 24, minute: 0 }));
        assert_eq!(prefs.reminder.hour, 21, "rejected time leaves settings unchanged");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        let mut prefs = Preferences::default();
        prefs.theme = Theme::Lavender;
        prefs.set_font_size(22.0);
        prefs.record_search("mercy");
        prefs.save(&path).unwrap();

        assert_eq!(Preferences::load(&path), prefs);
    }

    #[test]
    fn missing_or_malformed_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        assert_eq!(Preferences::load(&path), Preferences::default());

        fs::write(&path, "][").unwrap();
        assert_eq!(Preferences::load(&path), Preferences::default());
    }

    #[test]
    fn partial_document_fills_defaults_and_clamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, r#"{"theme": "mint", "fontSize": 99}"#).unwrap();

        let prefs = Preferences::load(&path);
        assert_eq!(prefs.theme, Theme::Mint);
        assert_eq!(prefs.font_size(), 26.0);
        assert_eq!(prefs.line_spacing(), DEFAULT_LINE_SPACING);
    }

    #[test]
    fn palette_lookup_by_name() {
        assert_eq!(palette_color("sky").map(|c| c.hex), Some("B3E5FC"));
        assert!(palette_color("crimson").is_none());
        assert_eq!(SUGGESTED_TAGS.len(), 8);
    }
}

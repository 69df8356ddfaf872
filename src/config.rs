//! Runtime configuration.
//!
//! Paths come from environment variables, with a `.env` file honoured outside
//! tests, and default to a `lamp` directory under the platform data dir:
//! - Linux: `~/.local/share/lamp`
//! - macOS: `~/Library/Application Support/lamp`
//! - Windows: `C:\Users\<user>\AppData\Roaming\lamp`

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DATA_DIR_VAR: &str = "LAMP_DATA_DIR";
pub const CORPUS_VAR: &str = "LAMP_CORPUS";
pub const DATABASE_VAR: &str = "LAMP_DB";
pub const PREFERENCES_VAR: &str = "LAMP_PREFERENCES";

/// Resolved file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Bundled KJV dataset.
    pub corpus_path: PathBuf,
    /// SQLite annotation store.
    pub database_path: PathBuf,
    pub preferences_path: PathBuf,
}

impl Config {
    /// Builds a configuration rooted at `data_dir` with default file names.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            corpus_path: data_dir.join("kjv.json"),
            database_path: data_dir.join("annotations.db"),
            preferences_path: data_dir.join("preferences.json"),
            data_dir,
        }
    }

    /// Loads configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let data_dir = match env_path(DATA_DIR_VAR)? {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let mut config = Self::in_dir(data_dir);

        if let Some(path) = env_path(CORPUS_VAR)? {
            config.corpus_path = path;
        }
        if let Some(path) = env_path(DATABASE_VAR)? {
            config.database_path = path;
        }
        if let Some(path) = env_path(PREFERENCES_VAR)? {
            config.preferences_path = path;
        }

        Ok(config)
    }
}

/// Returns `{data_dir}/lamp` for the current platform.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::MissingDataDir)?;
    Ok(data_dir.join("lamp"))
}

/// Ensures the parent directory of `path` exists.
pub fn ensure_parent_directory(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn env_path(var: &str) -> Result<Option<PathBuf>, ConfigError> {
    match std::env::var(var) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue(
            var.to_string(),
            "path must not be empty".to_string(),
        )),
        Ok(value) => Ok(Some(PathBuf::from(value))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue(
            var.to_string(),
            "path is not valid unicode".to_string(),
        )),
    }
}

//! Persisted search history: last-used directory and recent queries

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::MAX_HISTORY;

/// Search history kept between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    /// Directory of the last file searched
    pub last_directory: Option<PathBuf>,
    /// Successful queries, most recent first, without duplicates
    pub searches:       Vec<String>,
}

impl History {
    /// Load the history from `path`; a missing file yields an empty history
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(Error::history(&format!("failed to read {}: {e}", path.display())));
            },
        };
        let mut history: Self = toml::from_str(&text)
            .map_err(|e| Error::history(&format!("failed to parse {}: {e}", path.display())))?;
        history.searches.truncate(MAX_HISTORY);
        Ok(history)
    }

    /// Write the history to `path`, creating parent directories
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string(self)
            .map_err(|e| Error::history(&format!("failed to serialize: {e}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::history(&format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(path, text)
            .map_err(|e| Error::history(&format!("failed to write {}: {e}", path.display())))?;
        debug!("History saved to {}", path.display());
        Ok(())
    }

    /// Record a query that found matches
    ///
    /// Returns whether the list changed.
    pub fn record_search(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() || self.searches.first().is_some_and(|q| q == query) {
            return false;
        }
        self.searches.retain(|q| q != query);
        self.searches.insert(0, query.to_owned());
        self.searches.truncate(MAX_HISTORY);
        true
    }

    /// Remember the directory of the last file searched
    pub fn set_last_directory(&mut self, dir: &Path) {
        self.last_directory = Some(dir.to_path_buf());
    }

    /// Remember the absolute directory containing `file`
    ///
    /// Relative paths are resolved against the working directory; the
    /// stored directory is never empty.
    pub fn remember_file(&mut self, file: &Path) {
        let Ok(file) = fs::canonicalize(file).or_else(|_| std::path::absolute(file)) else {
            debug!("Cannot resolve {}; last directory unchanged", file.display());
            return;
        };
        if let Some(dir) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            self.set_last_directory(dir);
        }
    }
}

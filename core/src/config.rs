//! Service configuration
//!
//! Configuration is a small JSON document; every field has a default so
//! an empty object (or no file at all) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pagination::Pagination;
use crate::{Error, Result};

/// Default database file name
pub const DEFAULT_DB_FILENAME: &str = "phrasebook.db";

/// Settings for opening a phrasebook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
    /// Entries per page for paginated reads
    pub page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_FILENAME),
            page_size: Pagination::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::InvalidRequest(
                "Database path cannot be empty".to_string(),
            ));
        }
        Pagination::new(self.page_size).map(|_| ())
    }
}

//! # phrasebook-core
//!
//! Core library for the Phrasebook lookup service.
//!
//! This crate provides:
//! - Pagination and predicate building for listing, tag/usage filtering and keyword search
//! - Insert, batch insert and delete statement composition
//! - A SQLite-backed query executor for the `words` table
//! - JSONL bulk import
//! - C FFI exports for cross-platform integration
//!
//! ## Usage
//!
//! ```ignore
//! use phrasebook_core::init;
//!
//! let book = init("/path/to/phrasebook.db")?;
//! let page = book.filter_page("greeting", 1)?;
//! println!("{} of {}", page.entries.len(), page.total_count);
//! ```

pub mod assemble;
pub mod config;
pub mod db;
pub mod executor;
pub mod ffi;
pub mod import;
pub mod models;
pub mod pagination;
pub mod query;
pub mod response;
pub mod service;
pub mod write;

use thiserror::Error;

pub use config::Config;
pub use db::SqliteStore;
pub use executor::{QueryExecutor, QueryOutput, Row};
pub use models::{BatchInserted, Created, Deleted, EntryRecord, NewEntry, PageEnvelope};
pub use pagination::{Pagination, Window};
pub use query::{Filter, Keyword, Query, QueryPair, ReadRequest};
pub use response::Response;
pub use service::Phrasebook;

/// Errors that can occur in phrasebook-core operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`], used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or empty required input; never retried
    InvalidRequest,
    /// Nothing matched, or nothing was deleted
    NotFound,
    /// Any failure coming out of the store or the data it returned
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Database(_) | Error::Io(_) | Error::Json(_) | Error::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP-style status code for this error
    pub fn status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

/// Result type alias for phrasebook-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Open the phrasebook database at `db_path` with the default page size
///
/// Creates the database and the `words` table if they do not exist yet.
///
/// # Example
///
/// ```ignore
/// let book = phrasebook_core::init("/path/to/phrasebook.db")?;
/// ```
pub fn init(db_path: &str) -> Result<Phrasebook<SqliteStore>> {
    let store = SqliteStore::open(db_path)?;
    Ok(Phrasebook::new(store, Pagination::default()))
}

/// Open the phrasebook described by a [`Config`]
pub fn open_with_config(config: &Config) -> Result<Phrasebook<SqliteStore>> {
    config.validate()?;
    let store = SqliteStore::open(&config.database_path)?;
    Ok(Phrasebook::new(store, Pagination::new(config.page_size)?))
}

/// Import JSONL entries into the database at `db_path`
///
/// Accepts plain `.jsonl` or gzip-compressed `.jsonl.gz` files.
/// `progress` receives (current_line, total_lines).
pub fn import_jsonl(
    db_path: &str,
    jsonl_path: &str,
    progress: impl Fn(u64, u64),
) -> Result<import::ImportStats> {
    let store = SqliteStore::open(db_path)?;
    import::import_from_jsonl(&store, jsonl_path, import::DEFAULT_BATCH_SIZE, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("Record not found".to_string());
        assert_eq!(err.to_string(), "Not found: Record not found");
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(Error::InvalidRequest("x".into()).status(), 400);
        assert_eq!(Error::NotFound("x".into()).status(), 404);
        assert_eq!(Error::Internal("x".into()).status(), 500);
        assert_eq!(
            Error::Database(rusqlite::Error::QueryReturnedNoRows).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_init_creates_empty_book() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("book.db");
        let book = init(db_path.to_str().unwrap()).unwrap();

        let page = book.list_all().unwrap();
        assert_eq!(page.total_count, 0);
        assert!(page.entries.is_empty());
    }
}

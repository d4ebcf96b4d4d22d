//! SQLite store for the phrasebook
//!
//! This module handles:
//! - Database initialization and schema creation
//! - Executing composed statements and converting rows to field maps

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::Value;

use crate::executor::{QueryExecutor, QueryOutput, Row};
use crate::query::{Query, CASEFOLD_FUNCTION};
use crate::{Error, Result};

/// SQL schema for the phrasebook database
///
/// `AUTOINCREMENT` keeps ids from being reused after deletes. Tags are a
/// JSON array of strings.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    phrase TEXT NOT NULL,
    pronunciation TEXT,
    mandarin TEXT,
    definition TEXT,
    usage TEXT,
    tags TEXT NOT NULL DEFAULT '[]' CHECK (json_valid(tags)),
    audiourl TEXT
);

CREATE INDEX IF NOT EXISTS idx_words_usage ON words(usage);
"#;

/// Handle to an open phrasebook database
///
/// Cloning shares the underlying connection; each statement holds the
/// connection lock only while it runs.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the database at `db_path`, creating it and the schema if needed
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        log::info!("Opened phrasebook database at {:?}", db_path);
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run(&self, query: &Query) -> Result<QueryOutput> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to acquire database lock: {}", e)))?;

        let mut stmt = conn.prepare(&query.sql)?;

        if stmt.column_count() == 0 {
            let changed = stmt.execute(params_from_iter(query.params.iter()))?;
            return Ok(QueryOutput::affected(changed));
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_lowercase)
            .collect();

        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Row::new();
            for (index, name) in columns.iter().enumerate() {
                fields.insert(name.clone(), json_value(row.get_ref(index)?));
            }
            out.push(fields);
        }

        Ok(QueryOutput::from_rows(out))
    }
}

impl QueryExecutor for SqliteStore {
    fn execute(&self, query: &Query) -> Result<QueryOutput> {
        log::debug!("Executing {} with {} params", query.sql, query.params.len());
        let output = self.run(query)?;
        log::debug!("Statement returned {} rows", output.row_count);
        Ok(output)
    }
}

/// Install the scalar functions composed statements rely on
///
/// `casefold(x)` lowercases text with full Unicode rules; SQLite's own
/// `lower()` and `LIKE` only fold ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        CASEFOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    Ok(())
}

/// Convert a column value into its JSON field representation
fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value as SqlValue;

    fn setup_test_db() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteStore::open(&db_path).unwrap();
        (dir, store)
    }

    fn query(sql: &str, params: Vec<SqlValue>) -> Query {
        Query {
            sql: sql.to_string(),
            params,
        }
    }

    #[test]
    fn test_open_creates_words_table() {
        let (_dir, store) = setup_test_db();

        let output = store
            .execute(&query(
                "SELECT COUNT(*) AS count FROM sqlite_master WHERE type='table' AND name='words'",
                vec![],
            ))
            .unwrap();
        assert_eq!(output.rows[0]["count"], 1);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let store = SqliteStore::open(&db_path).unwrap();
        store
            .execute(&query(
                "INSERT INTO words (phrase) VALUES (?1)",
                vec![SqlValue::Text("你好".into())],
            ))
            .unwrap();
        drop(store);

        let store = SqliteStore::open(&db_path).unwrap();
        let output = store
            .execute(&query("SELECT phrase, tags FROM words", vec![]))
            .unwrap();
        assert_eq!(output.rows[0]["phrase"], "你好");
        assert_eq!(output.rows[0]["tags"], "[]");
    }

    #[test]
    fn test_write_reports_changed_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let output = store
            .execute(&query(
                "INSERT INTO words (phrase) VALUES (?1), (?2)",
                vec![SqlValue::Text("a".into()), SqlValue::Text("b".into())],
            ))
            .unwrap();
        assert_eq!(output.row_count, 2);
        assert!(output.rows.is_empty());
    }

    #[test]
    fn test_returning_yields_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let output = store
            .execute(&query(
                "INSERT INTO words (phrase) VALUES (?1) RETURNING id",
                vec![SqlValue::Text("a".into())],
            ))
            .unwrap();
        assert_eq!(output.row_count, 1);
        assert_eq!(output.rows[0]["id"], 1);
    }

    #[test]
    fn test_parameter_count_mismatch_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .execute(&query(
                "INSERT INTO words (phrase, definition) VALUES (?1, ?2)",
                vec![SqlValue::Text("a".into())],
            ))
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_constraint_violation_surfaces_message() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .execute(&query(
                "INSERT INTO words (phrase) VALUES (?1)",
                vec![SqlValue::Null],
            ))
            .unwrap_err();
        assert!(err.to_string().contains("NOT NULL"));
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let insert = query(
            "INSERT INTO words (phrase) VALUES (?1) RETURNING id",
            vec![SqlValue::Text("a".into())],
        );
        let first = store.execute(&insert).unwrap().rows[0]["id"].as_i64().unwrap();
        store
            .execute(&query(
                "DELETE FROM words WHERE id = ?1",
                vec![SqlValue::Integer(first)],
            ))
            .unwrap();
        let second = store.execute(&insert).unwrap().rows[0]["id"].as_i64().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_casefold_lowercases_unicode_and_passes_null() {
        let store = SqliteStore::open_in_memory().unwrap();
        let output = store
            .execute(&query(
                "SELECT casefold(?1) AS folded, casefold(NULL) AS missing",
                vec![SqlValue::Text("XIÈXIÈ Ärger".into())],
            ))
            .unwrap();
        assert_eq!(output.rows[0]["folded"], "xièxiè ärger");
        assert!(output.rows[0]["missing"].is_null());
    }
}

//! The statement execution contract between the query engine and a store

use serde_json::{Map, Value};

use crate::query::Query;
use crate::Result;

/// One result row, keyed by storage column name in statement column order
pub type Row = Map<String, Value>;

/// Rows returned by a statement plus the number of rows it touched
///
/// For statements that return rows (SELECT, INSERT ... RETURNING) the
/// row count is the number of rows returned; otherwise it is the number
/// of rows changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<Row>,
    pub row_count: usize,
}

/// Runs one parameterized statement against the store
///
/// Implementations must reject parameter lists whose length does not
/// match the number of placeholders in the statement.
pub trait QueryExecutor {
    fn execute(&self, query: &Query) -> Result<QueryOutput>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn execute(&self, query: &Query) -> Result<QueryOutput> {
        (**self).execute(query)
    }
}

impl QueryOutput {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self { rows, row_count }
    }

    pub fn affected(row_count: usize) -> Self {
        Self {
            rows: Vec::new(),
            row_count,
        }
    }
}

//! Insert and delete statement composition
//!
//! Multi-row inserts bind every field of every record positionally:
//! record `i` of a statement with `stride` columns occupies placeholders
//! `stride*i + 1 ..= stride*i + stride`, and the parameter list is the
//! records' values flattened in the same order.

use std::ops::RangeInclusive;

use rusqlite::types::Value;

use crate::models::{ImportEntry, NewEntry};
use crate::query::{Query, TABLE};
use crate::{Error, Result};

/// Columns written by single and batch inserts
pub const ENTRY_COLUMNS: [&str; 5] = ["phrase", "pronunciation", "definition", "tags", "audiourl"];

/// Columns written by bulk import
pub const IMPORT_COLUMNS: [&str; 7] = [
    "phrase",
    "pronunciation",
    "mandarin",
    "definition",
    "usage",
    "tags",
    "audiourl",
];

/// Most parameters SQLite binds in one statement (`SQLITE_MAX_VARIABLE_NUMBER`)
pub const MAX_BOUND_PARAMS: usize = 32766;

/// Placeholder positions (1-based) for the record at `record_index`
pub fn placeholder_range(record_index: usize, stride: usize) -> RangeInclusive<usize> {
    let first = record_index * stride + 1;
    first..=first + stride - 1
}

/// `(?a, ?b, ...)` group for the record at `record_index`
fn placeholder_group(record_index: usize, stride: usize) -> String {
    let slots = placeholder_range(record_index, stride)
        .map(|position| format!("?{}", position))
        .collect::<Vec<_>>()
        .join(", ");
    format!("({})", slots)
}

/// Accumulates field tuples and emits one multi-row INSERT
#[derive(Debug)]
pub struct InsertBuilder<'a> {
    columns: &'a [&'a str],
    rows: Vec<Vec<Value>>,
    returning: Option<&'a str>,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(columns: &'a [&'a str]) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            returning: None,
        }
    }

    /// Append one record; its values must line up with the columns
    pub fn push(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::Internal(format!(
                "Insert row has {} values for {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        self.rows.push(values);
        Ok(())
    }

    pub fn returning(mut self, column: &'a str) -> Self {
        self.returning = Some(column);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Emit the statement text and the flattened parameters together
    pub fn build(self) -> Result<Query> {
        if self.rows.is_empty() {
            return Err(Error::InvalidRequest(
                "Invalid input, expected an array of words".to_string(),
            ));
        }

        let stride = self.columns.len();
        let max_records = MAX_BOUND_PARAMS / stride;
        if self.rows.len() > max_records {
            return Err(Error::InvalidRequest(format!(
                "Batch of {} records exceeds the limit of {} per statement",
                self.rows.len(),
                max_records
            )));
        }

        let groups = (0..self.rows.len())
            .map(|index| placeholder_group(index, stride))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            TABLE,
            self.columns.join(", "),
            groups
        );
        if let Some(column) = self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(column);
        }

        Ok(Query {
            sql,
            params: self.rows.into_iter().flatten().collect(),
        })
    }
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

fn tags_value(tags: &[String]) -> Result<Value> {
    Ok(Value::Text(serde_json::to_string(tags)?))
}

impl NewEntry {
    /// Values in [`ENTRY_COLUMNS`] order
    pub fn column_values(&self) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(self.phrase.clone()),
            optional_text(&self.pronunciation),
            optional_text(&self.definition),
            tags_value(&self.tags)?,
            optional_text(&self.audio_reference),
        ])
    }
}

impl ImportEntry {
    /// Values in [`IMPORT_COLUMNS`] order
    pub fn column_values(&self) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(self.phrase.clone()),
            optional_text(&self.pronunciation),
            optional_text(&self.translation),
            optional_text(&self.definition),
            optional_text(&self.usage),
            tags_value(&self.tags)?,
            optional_text(&self.audio_reference),
        ])
    }
}

/// Single-row insert returning the generated id
pub fn single_insert(entry: &NewEntry) -> Result<Query> {
    let mut builder = InsertBuilder::new(&ENTRY_COLUMNS).returning("id");
    builder.push(entry.column_values()?)?;
    builder.build()
}

/// One multi-row insert for the whole batch
///
/// Fails with `InvalidRequest` when `entries` is empty.
pub fn batch_insert(entries: &[NewEntry]) -> Result<Query> {
    let mut builder = InsertBuilder::new(&ENTRY_COLUMNS);
    for entry in entries {
        builder.push(entry.column_values()?)?;
    }
    builder.build()
}

/// Delete of at most one record by id
pub fn delete_by_id(id: i64) -> Query {
    Query {
        sql: format!("DELETE FROM {} WHERE id = ?1", TABLE),
        params: vec![Value::Integer(id)],
    }
}

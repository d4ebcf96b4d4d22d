//! Mapping raw store rows into entry records and page envelopes

use serde_json::Value;

use crate::executor::{QueryOutput, Row};
use crate::models::{EntryRecord, PageEnvelope};
use crate::{Error, Result};

/// Build the page envelope from the count and fetch results
pub fn page(count: &QueryOutput, fetch: &QueryOutput) -> Result<PageEnvelope> {
    let total_count = total_count(count)?;
    let entries = fetch
        .rows
        .iter()
        .map(entry_from_row)
        .collect::<Result<Vec<_>>>()?;
    Ok(PageEnvelope::new(entries, total_count))
}

/// Read the total from a `COUNT(*)` result
///
/// Reads the `count` column, or the first column in statement order when
/// none is named that. The count may arrive as an integer or as numeric
/// text.
pub fn total_count(output: &QueryOutput) -> Result<u64> {
    let row = output
        .rows
        .first()
        .ok_or_else(|| Error::Internal("Count query returned no rows".to_string()))?;

    let value = row
        .get("count")
        .or_else(|| row.values().next())
        .ok_or_else(|| Error::Internal("Count query returned no columns".to_string()))?;

    let parsed = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| Error::Internal(format!("Count is not a non-negative integer: {}", value)))
}

/// Project one storage row onto an [`EntryRecord`]
pub fn entry_from_row(row: &Row) -> Result<EntryRecord> {
    let id = row
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Internal("Row is missing an integer id".to_string()))?;

    let phrase = optional_text(row, "phrase")?
        .ok_or_else(|| Error::Internal(format!("Row {} is missing a phrase", id)))?;

    Ok(EntryRecord {
        id,
        phrase,
        pronunciation: optional_text(row, "pronunciation")?,
        translation: optional_text(row, "mandarin")?,
        definition: optional_text(row, "definition")?,
        usage: optional_text(row, "usage")?,
        tags: tags(row, id)?,
        audio_reference: optional_text(row, "audiourl")?,
    })
}

fn optional_text(row: &Row, column: &str) -> Result<Option<String>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(Error::Internal(format!(
            "Column {} holds a non-text value: {}",
            column, other
        ))),
    }
}

/// Tags are stored as a JSON array; NULL means no tags
fn tags(row: &Row, id: i64) -> Result<Vec<String>> {
    let malformed = || Error::Internal(format!("Row {} has malformed tags", id));

    match row.get("tags") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) => serde_json::from_str(text).map_err(|_| malformed()),
        Some(array @ Value::Array(_)) => {
            serde_json::from_value(array.clone()).map_err(|_| malformed())
        }
        Some(_) => Err(malformed()),
    }
}

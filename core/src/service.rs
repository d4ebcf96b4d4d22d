//! Request handling on top of a [`QueryExecutor`]
//!
//! Reads run the count statement and then the fetch statement as two
//! separate calls. They are not wrapped in a transaction, so a write
//! landing in between can make the total and the page disagree.

use serde_json::Value;

use crate::executor::QueryExecutor;
use crate::models::{BatchInserted, Created, Deleted, NewEntry, PageEnvelope};
use crate::pagination::Pagination;
use crate::query::{self, ReadRequest};
use crate::{assemble, write, Error, Result};

/// The phrasebook service: pagination policy plus a store
#[derive(Clone)]
pub struct Phrasebook<E> {
    executor: E,
    pagination: Pagination,
}

impl<E: QueryExecutor> Phrasebook<E> {
    pub fn new(executor: E, pagination: Pagination) -> Self {
        Self {
            executor,
            pagination,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Answer any read request with a page envelope
    ///
    /// Search requests that fetch no rows fail with `NotFound`; the other
    /// shapes return an empty page instead.
    pub fn read(&self, request: &ReadRequest) -> Result<PageEnvelope> {
        let window = request
            .page()
            .map(|page| self.pagination.window_for(page))
            .transpose()?;

        let pair = query::build(request, window);
        let count = self.executor.execute(&pair.count)?;
        let fetch = self.executor.execute(&pair.fetch)?;
        let envelope = assemble::page(&count, &fetch)?;

        if matches!(request, ReadRequest::Search { .. }) && envelope.entries.is_empty() {
            return Err(Error::NotFound("No matching results found".to_string()));
        }

        log::debug!(
            "Read {:?}: {} entries of {}",
            request,
            envelope.entries.len(),
            envelope.total_count
        );
        Ok(envelope)
    }

    /// Every entry, ignoring pagination
    pub fn list_all(&self) -> Result<PageEnvelope> {
        self.read(&ReadRequest::All)
    }

    /// One page of every entry, ordered by id
    pub fn list_page(&self, page: i64) -> Result<PageEnvelope> {
        self.read(&ReadRequest::Page { page })
    }

    /// One page of entries matching a tag, or a usage category for "Proverb"/"EL"
    pub fn filter_page(&self, tag: &str, page: i64) -> Result<PageEnvelope> {
        self.read(&ReadRequest::filtered(tag, page))
    }

    /// One page of entries containing `keyword` in any text field
    pub fn search_page(&self, keyword: &str, page: i64) -> Result<PageEnvelope> {
        let request = ReadRequest::search(keyword, page)
            .inspect_err(|e| log::warn!("Rejected search: {}", e))?;
        self.read(&request)
    }

    /// Insert one entry and return its generated id
    pub fn insert(&self, entry: &NewEntry) -> Result<Created> {
        let statement = write::single_insert(entry)?;
        let output = self.executor.execute(&statement)?;

        let id = output
            .rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Internal("Insert did not return an id".to_string()))?;

        log::info!("Record created with ID {}", id);
        Ok(Created { id })
    }

    /// Insert one entry from a JSON payload
    pub fn insert_json(&self, payload: &Value) -> Result<Created> {
        let entry: NewEntry = serde_json::from_value(payload.clone())
            .map_err(|e| Error::InvalidRequest(format!("Invalid record: {}", e)))?;
        self.insert(&entry)
    }

    /// Insert all entries with a single statement
    ///
    /// Fails with `InvalidRequest` for an empty batch or one too large to
    /// bind in a single statement, before the store is touched. The batch
    /// succeeds or fails as a unit.
    pub fn batch_insert(&self, entries: &[NewEntry]) -> Result<BatchInserted> {
        let statement = write::batch_insert(entries)?;
        let output = self.executor.execute(&statement)?;

        log::info!("Batch insert successful, inserted {} records", output.row_count);
        Ok(BatchInserted {
            inserted: output.row_count,
        })
    }

    /// Insert a batch from a JSON payload, which must be a non-empty array
    pub fn batch_insert_json(&self, payload: &Value) -> Result<BatchInserted> {
        let invalid = || Error::InvalidRequest("Invalid input, expected an array of words".to_string());

        let items = payload.as_array().ok_or_else(invalid)?;
        if items.is_empty() {
            return Err(invalid());
        }

        let entries = items
            .iter()
            .map(|item| serde_json::from_value::<NewEntry>(item.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidRequest(format!("Invalid record in batch: {}", e)))?;

        self.batch_insert(&entries)
    }

    /// Delete one entry by id
    pub fn delete(&self, id: i64) -> Result<Deleted> {
        let output = self.executor.execute(&write::delete_by_id(id))?;
        if output.row_count == 0 {
            return Err(Error::NotFound("Record not found".to_string()));
        }

        log::info!("Record with ID {} deleted", id);
        Ok(Deleted { id })
    }
}

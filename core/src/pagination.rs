//! Page number to offset/limit conversion

use crate::{Error, Result};

/// Converts 1-based page numbers into row windows of a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: u32,
}

/// The rows to fetch for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    offset: i64,
    limit: u32,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    pub fn new(page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidRequest(
                "Page size must be at least 1".to_string(),
            ));
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Window for a 1-based page: offset `(page - 1) * page_size`
    ///
    /// No upper bound is checked; a page past the data is simply empty.
    pub fn window_for(&self, page: i64) -> Result<Window> {
        if page < 1 {
            return Err(Error::InvalidRequest(format!(
                "Page must be a positive integer, got {}",
                page
            )));
        }

        let offset = (page - 1)
            .checked_mul(i64::from(self.page_size))
            .ok_or_else(|| Error::InvalidRequest(format!("Page {} is out of range", page)))?;

        Ok(Window {
            offset,
            limit: self.page_size,
        })
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Window {
    /// Number of rows skipped, never negative
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

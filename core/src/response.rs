//! Status-coded response bodies shared by the FFI layer and the CLI
//!
//! Reads render the page envelope. Writes and errors render a
//! `{status, message}` object; writes also echo the id or row count.

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{BatchInserted, Created, Deleted, PageEnvelope};
use crate::{Error, Result};

/// A status code and the JSON body to send with it
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

/// The uniform error body
#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    pub status: u16,
    pub message: String,
}

impl Response {
    pub fn page(result: Result<PageEnvelope>) -> Self {
        match result {
            Ok(page) => match serde_json::to_value(&page) {
                Ok(body) => Self { status: 200, body },
                Err(e) => Self::error(&Error::Json(e)),
            },
            Err(e) => Self::error(&e),
        }
    }

    pub fn created(result: Result<Created>) -> Self {
        match result {
            Ok(Created { id }) => Self {
                status: 201,
                body: json!({
                    "status": 201,
                    "message": format!("Record created with ID {}", id),
                    "id": id,
                }),
            },
            Err(e) => Self::error(&e),
        }
    }

    pub fn batch_inserted(result: Result<BatchInserted>) -> Self {
        match result {
            Ok(BatchInserted { inserted }) => Self {
                status: 201,
                body: json!({
                    "status": 201,
                    "message": format!("Batch insert successful, inserted {} records.", inserted),
                    "inserted": inserted,
                }),
            },
            Err(e) => Self::error(&e),
        }
    }

    pub fn deleted(result: Result<Deleted>) -> Self {
        match result {
            Ok(Deleted { id }) => Self {
                status: 200,
                body: json!({
                    "status": 200,
                    "message": format!("Record with ID {} deleted", id),
                    "id": id,
                }),
            },
            Err(e) => Self::error(&e),
        }
    }

    pub fn error(err: &Error) -> Self {
        let status = err.status();
        if status == 500 {
            log::error!("Request failed: {}", err);
        }
        let body = StatusMessage {
            status,
            message: err.to_string(),
        };
        Self {
            status,
            body: json!(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

//! C FFI exports for cross-platform integration
//!
//! This module provides a C-compatible API over the phrasebook service.
//! Every request function writes an HTTP-style status to `out_status` and
//! a JSON body to `out_json` (see [`crate::response`]). The return value
//! only reports problems with the call itself: null pointers, invalid
//! UTF-8, or a missing database handle.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_longlong};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::db::SqliteStore;
use crate::response::Response;
use crate::service::Phrasebook;
use crate::{init, Error};

/// Global handle storage for FFI
static HANDLE: Mutex<Option<Phrasebook<SqliteStore>>> = Mutex::new(None);

/// Error codes returned by FFI functions
#[repr(C)]
pub enum FfiError {
    /// The request ran; see `out_status` for its outcome
    Success = 0,
    /// Null pointer passed as argument
    NullPointer = 1,
    /// Invalid UTF-8 string
    InvalidUtf8 = 2,
    /// Database initialization failed
    InitFailed = 3,
    /// Database not initialized
    NotInitialized = 4,
    /// JSON serialization failed
    JsonFailed = 5,
}

fn handle() -> MutexGuard<'static, Option<Phrasebook<SqliteStore>>> {
    HANDLE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Borrow a C string argument as `&str`
///
/// # Safety
///
/// `ptr` must be null or a valid null-terminated C string.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Result<&'a str, FfiError> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer);
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| FfiError::InvalidUtf8)
}

/// Run `f` against the open phrasebook and write its response
///
/// # Safety
///
/// `out_status` and `out_json` must be null or valid for writes.
unsafe fn respond(
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
    f: impl FnOnce(&Phrasebook<SqliteStore>) -> Response,
) -> c_int {
    if out_status.is_null() || out_json.is_null() {
        return FfiError::NullPointer as c_int;
    }

    let guard = handle();
    let book = match guard.as_ref() {
        Some(book) => book,
        None => return FfiError::NotInitialized as c_int,
    };

    let response = f(book);

    let json = match serde_json::to_string(&response.body) {
        Ok(j) => j,
        Err(_) => return FfiError::JsonFailed as c_int,
    };

    let c_string = match CString::new(json) {
        Ok(s) => s,
        Err(_) => return FfiError::JsonFailed as c_int,
    };

    *out_status = c_int::from(response.status);
    *out_json = c_string.into_raw();
    FfiError::Success as c_int
}

/// Parse a JSON payload argument, turning decode failures into a 400 response
fn with_payload(
    payload: &str,
    f: impl FnOnce(&serde_json::Value) -> Response,
) -> Response {
    match serde_json::from_str(payload) {
        Ok(value) => f(&value),
        Err(e) => Response::error(&Error::InvalidRequest(format!("Malformed JSON payload: {}", e))),
    }
}

/// Open the phrasebook database
///
/// # Safety
///
/// `db_path` must be a valid null-terminated C string.
///
/// # Returns
///
/// 0 on success, non-zero error code on failure.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_open(db_path: *const c_char) -> c_int {
    let path = match str_arg(db_path) {
        Ok(p) => p,
        Err(code) => return code as c_int,
    };

    match init(path) {
        Ok(book) => {
            *handle() = Some(book);
            FfiError::Success as c_int
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            FfiError::InitFailed as c_int
        }
    }
}

/// List every entry
///
/// # Safety
///
/// `out_status` and `out_json` must be valid pointers. The caller frees
/// `*out_json` with `phrasebook_free_string`.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_list_all(
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
) -> c_int {
    respond(out_status, out_json, |book| Response::page(book.list_all()))
}

/// List one page of every entry
///
/// # Safety
///
/// See `phrasebook_list_all`.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_list_page(
    page: c_longlong,
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
) -> c_int {
    respond(out_status, out_json, |book| Response::page(book.list_page(page)))
}

/// List one page of entries for a tag or usage category
///
/// # Safety
///
/// `tag` must be a valid null-terminated C string; see also
/// `phrasebook_list_all`.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_filter(
    tag: *const c_char,
    page: c_longlong,
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
) -> c_int {
    let tag = match str_arg(tag) {
        Ok(t) => t,
        Err(code) => return code as c_int,
    };
    respond(out_status, out_json, |book| {
        Response::page(book.filter_page(tag, page))
    })
}

/// Search one page of entries by keyword
///
/// # Safety
///
/// `keyword` must be a valid null-terminated C string; see also
/// `phrasebook_list_all`.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_search(
    keyword: *const c_char,
    page: c_longlong,
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
) -> c_int {
    let keyword = match str_arg(keyword) {
        Ok(k) => k,
        Err(code) => return code as c_int,
    };
    respond(out_status, out_json, |book| {
        Response::page(book.search_page(keyword, page))
    })
}

/// Insert one entry given as a JSON object
///
/// # Safety
///
/// `payload` must be a valid null-terminated C string; see also
/// `phrasebook_list_all`.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_insert(
    payload: *const c_char,
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
) -> c_int {
    let payload = match str_arg(payload) {
        Ok(p) => p,
        Err(code) => return code as c_int,
    };
    respond(out_status, out_json, |book| {
        with_payload(payload, |value| Response::created(book.insert_json(value)))
    })
}

/// Insert a batch of entries given as a JSON array
///
/// # Safety
///
/// `payload` must be a valid null-terminated C string; see also
/// `phrasebook_list_all`.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_batch_insert(
    payload: *const c_char,
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
) -> c_int {
    let payload = match str_arg(payload) {
        Ok(p) => p,
        Err(code) => return code as c_int,
    };
    respond(out_status, out_json, |book| {
        with_payload(payload, |value| {
            Response::batch_inserted(book.batch_insert_json(value))
        })
    })
}

/// Delete one entry by id
///
/// # Safety
///
/// See `phrasebook_list_all`.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_delete(
    id: c_longlong,
    out_status: *mut c_int,
    out_json: *mut *mut c_char,
) -> c_int {
    respond(out_status, out_json, |book| Response::deleted(book.delete(id)))
}

/// Free a string returned through `out_json`
///
/// # Safety
///
/// `ptr` must be a pointer returned by a phrasebook_* function, or null.
#[no_mangle]
pub unsafe extern "C" fn phrasebook_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Close the phrasebook and free resources
///
/// # Returns
///
/// 0 on success.
#[no_mangle]
pub extern "C" fn phrasebook_close() -> c_int {
    *handle() = None;
    FfiError::Success as c_int
}

/// Get the library version
///
/// # Safety
///
/// Returns a pointer to a static string. Do not free this pointer.
#[no_mangle]
pub extern "C" fn phrasebook_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

//! FFI bindings for Pantomime
//!
//! This module provides C-compatible functions so a UI written in another
//! language can drive the tick processor. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `pantomime_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::PipelineConfig;
use crate::error::TrackingError;
use crate::pipeline::{process_ticks, TickProcessor};
use crate::schema::TickAdapter;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// NULL selects the default configuration
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<PipelineConfig, TrackingError> {
    if config_json.is_null() {
        return Ok(PipelineConfig::default());
    }
    let json = cstr_to_string(config_json)
        .ok_or_else(|| TrackingError::InvalidConfig("config is not valid UTF-8".to_string()))?;
    PipelineConfig::from_json(&json)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Run a fresh processor over NDJSON tick records and return a JSON array of
/// reports.
///
/// # Safety
/// - `ndjson` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL.
/// - Returns a newly allocated string that must be freed with `pantomime_free_string`.
/// - Returns NULL on error; call `pantomime_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pantomime_process_ticks(
    ndjson: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let input = match cstr_to_string(ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid NDJSON string pointer");
            return ptr::null_mut();
        }
    };

    let config = match config_from_ptr(config_json) {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match process_ticks(&input, config) {
        // Each report is already valid JSON
        Ok(reports) => string_to_cstr(&format!("[{}]", reports.join(","))),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a TickProcessor
pub struct PantomimeProcessorHandle {
    processor: TickProcessor,
}

/// Create a new TickProcessor.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `pantomime_processor_free`.
/// - Returns NULL on error; call `pantomime_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pantomime_processor_new(
    config_json: *const c_char,
) -> *mut PantomimeProcessorHandle {
    clear_last_error();

    let processor = match config_from_ptr(config_json).and_then(TickProcessor::with_config) {
        Ok(processor) => processor,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    Box::into_raw(Box::new(PantomimeProcessorHandle { processor }))
}

/// Free a TickProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `pantomime_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pantomime_processor_free(processor: *mut PantomimeProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process one tick record and return its report.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `pantomime_processor_new`.
/// - `tick_json` must be a valid null-terminated C string holding one record.
/// - Returns a newly allocated string that must be freed with `pantomime_free_string`.
/// - Returns NULL on error; call `pantomime_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pantomime_processor_process_tick(
    processor: *mut PantomimeProcessorHandle,
    tick_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(tick_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid tick JSON string pointer");
            return ptr::null_mut();
        }
    };

    let result = TickAdapter::parse_record(&json_str)
        .and_then(|record| handle.processor.process_record(&record))
        .and_then(|frame| serde_json::to_string(&frame).map_err(TrackingError::JsonError));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Save processor session state to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `pantomime_processor_new`.
/// - Returns a newly allocated string that must be freed with `pantomime_free_string`.
/// - Returns NULL on error; call `pantomime_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pantomime_processor_save_state(
    processor: *mut PantomimeProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.save_state() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load processor session state from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `pantomime_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `pantomime_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pantomime_processor_load_state(
    processor: *mut PantomimeProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.processor.load_state(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Pantomime functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Pantomime function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pantomime_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Pantomime function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pantomime_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Pantomime library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pantomime_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

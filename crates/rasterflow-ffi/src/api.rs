//! The exported C surface.
//!
//! All functions are safe against null, stale, and double-destroyed
//! handles. Fallible calls return `false` (or null) and leave the
//! specific failure in the context's error state for the `error_*`
//! accessors to report.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rasterflow_codecs::InputBytes;
use rasterflow_core::{CancelToken, ErrorKind, FlowError, IoId};
use rasterflow_engine::{abi_compatible, Context, ABI_MAJOR, ABI_MINOR};

use crate::handle::HandleTable;

/// HTTP-shaped response returned by [`rasterflow_context_send_json`].
///
/// Owned by the context handle; the pointer and its buffer stay valid
/// until the context is destroyed.
#[repr(C)]
pub struct RasterflowJsonResponse {
    /// HTTP-style status code.
    pub status_code: i64,
    /// UTF-8 response body.
    pub buffer: *const u8,
    /// Body length in bytes.
    pub buffer_size: usize,
}

/// Lifetime pledge for caller-provided buffers.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterflowLifetime {
    /// The engine copies the bytes before returning.
    OutlivesFunctionCall = 0,
    /// The caller pledges the bytes outlive the context; no copy.
    OutlivesContext = 1,
}

struct StoredResponse {
    // Keeps the body bytes alive; `ffi.buffer` points into it.
    _body: Vec<u8>,
    ffi: Box<RasterflowJsonResponse>,
}

// SAFETY-adjacent: the raw pointer inside `RasterflowJsonResponse` points
// into `_body`, which is owned by the same entry and never mutated.
#[allow(unsafe_code)]
unsafe impl Send for StoredResponse {}

struct ContextEntry {
    context: Arc<RwLock<Context>>,
    cancel: Arc<CancelToken>,
    responses: Arc<Mutex<Vec<StoredResponse>>>,
}

static CONTEXTS: Mutex<HandleTable<ContextEntry>> = Mutex::new(HandleTable::new());

fn table() -> MutexGuard<'static, HandleTable<ContextEntry>> {
    // A poisoned table mutex means a prior panic; the table itself is
    // still structurally sound.
    CONTEXTS.lock().unwrap_or_else(|p| p.into_inner())
}

fn entry(handle: u64) -> Option<(Arc<RwLock<Context>>, Arc<CancelToken>)> {
    let guard = table();
    guard
        .get(handle)
        .map(|e| (Arc::clone(&e.context), Arc::clone(&e.cancel)))
}

fn responses(handle: u64) -> Option<Arc<Mutex<Vec<StoredResponse>>>> {
    let guard = table();
    guard.get(handle).map(|e| Arc::clone(&e.responses))
}

/// Run `f` under the context write lock, converting panics to
/// `InternalError` on the context.
fn with_context_write<R>(handle: u64, on_failure: R, f: impl FnOnce(&mut Context) -> R) -> R {
    let Some((ctx, _)) = entry(handle) else {
        return on_failure;
    };
    let caught = catch_unwind(AssertUnwindSafe(|| {
        let mut guard = ctx.write().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }));
    match caught {
        Ok(result) => result,
        Err(_) => {
            let mut guard = ctx.write().unwrap_or_else(|p| p.into_inner());
            guard.raise_error(FlowError::new(
                ErrorKind::InternalError,
                "panic caught at the FFI boundary",
            ));
            on_failure
        }
    }
}

/// Run `f` under the context read lock.
fn with_context_read<R>(handle: u64, on_failure: R, f: impl FnOnce(&Context) -> R) -> R {
    let Some((ctx, _)) = entry(handle) else {
        return on_failure;
    };
    catch_unwind(AssertUnwindSafe(|| {
        let guard = ctx.read().unwrap_or_else(|p| p.into_inner());
        f(&guard)
    }))
    .unwrap_or(on_failure)
}

// ── versioning ───────────────────────────────────────────────

/// The library's ABI major version.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_abi_version_major() -> u32 {
    ABI_MAJOR
}

/// The library's ABI minor version.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_abi_version_minor() -> u32 {
    ABI_MINOR
}

/// True iff a caller built against `major.minor` can use this library.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_abi_compatible(major: u32, minor: u32) -> bool {
    abi_compatible(major, minor)
}

// ── context lifecycle ────────────────────────────────────────

/// Create a context. Returns 0 when the requested ABI is incompatible.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_create(abi_major: u32, abi_minor: u32) -> u64 {
    if !abi_compatible(abi_major, abi_minor) {
        return 0;
    }
    catch_unwind(|| {
        let context = Context::new();
        let cancel = context.cancel_token();
        table().insert(ContextEntry {
            context: Arc::new(RwLock::new(context)),
            cancel,
            responses: Arc::new(Mutex::new(Vec::new())),
        })
    })
    .unwrap_or(0)
}

/// Destroy a context, cascade-freeing everything it owns.
///
/// Safe on handle 0 and on already-destroyed handles. Must not race other
/// users of the same handle.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_destroy(handle: u64) -> bool {
    if handle == 0 {
        return true;
    }
    table().remove(handle).is_some()
}

// ── I/O registration ─────────────────────────────────────────

/// Register an input buffer under a unique `io_id`.
///
/// `lifetime` 0 copies the bytes before returning; 1 borrows them, and
/// the caller pledges they outlive the context.
///
/// # Safety
///
/// `buffer` must point to `buffer_len` readable bytes; with lifetime 1
/// they must stay valid and unmodified until the context is destroyed.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_add_input_buffer(
    handle: u64,
    io_id: i32,
    buffer: *const u8,
    buffer_len: usize,
    lifetime: i32,
) -> bool {
    if buffer.is_null() && buffer_len > 0 {
        return with_context_write(handle, false, |ctx| {
            ctx.raise_error(FlowError::new(
                ErrorKind::NullArgument,
                "input buffer pointer is null",
            ));
            false
        });
    }
    // SAFETY: buffer points to buffer_len readable bytes per the caller
    // contract; for the borrowed case the caller pledged context-outliving
    // validity, which justifies the 'static slice.
    let slice: &'static [u8] = unsafe { std::slice::from_raw_parts(buffer, buffer_len) };
    let bytes = match lifetime {
        0 => InputBytes::Owned(slice.to_vec()),
        1 => InputBytes::Static(slice),
        _ => {
            return with_context_write(handle, false, |ctx| {
                ctx.raise_error(FlowError::new(
                    ErrorKind::InvalidArgument,
                    format!("unknown buffer lifetime {lifetime}"),
                ));
                false
            })
        }
    };
    with_context_write(handle, false, |ctx| {
        ctx.add_input_buffer(IoId(io_id), bytes).is_ok()
    })
}

/// Register a growable, context-owned output buffer.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_add_output_buffer(handle: u64, io_id: i32) -> bool {
    with_context_write(handle, false, |ctx| {
        ctx.add_output_buffer(IoId(io_id)).is_ok()
    })
}

/// Fetch a read-only view of an output buffer.
///
/// The pointer stays valid until the context is destroyed or the job is
/// executed again; it must not be read concurrently with either.
///
/// # Safety
///
/// `result_buffer` and `result_buffer_length` must be valid writable
/// pointers.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_get_output_buffer_by_id(
    handle: u64,
    io_id: i32,
    result_buffer: *mut *const u8,
    result_buffer_length: *mut usize,
) -> bool {
    if result_buffer.is_null() || result_buffer_length.is_null() {
        return false;
    }
    with_context_read(handle, false, |ctx| match ctx.get_output_buffer(IoId(io_id)) {
        Ok(bytes) => {
            // SAFETY: out-pointers are valid per the caller contract.
            unsafe {
                *result_buffer = bytes.as_ptr();
                *result_buffer_length = bytes.len();
            }
            true
        }
        Err(_) => false,
    })
}

// ── error state ──────────────────────────────────────────────

/// Whether the context is in an errored (or cancelled) state.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_has_error(handle: u64) -> bool {
    with_context_read(handle, false, Context::has_error)
}

/// ABI-stable error code; 0 when no error.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_error_code(handle: u64) -> i32 {
    with_context_read(handle, 0, Context::error_code)
}

/// Whether the current error may be cleared by the client.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_error_recoverable(handle: u64) -> bool {
    with_context_read(handle, false, Context::error_recoverable)
}

/// Clear a recoverable error; returns whether the context is now clean.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_error_try_clear(handle: u64) -> bool {
    with_context_write(handle, false, Context::try_clear_error)
}

/// Render the error state (message plus callstack) into a caller buffer.
///
/// Truncation-safe: a too-small buffer receives a prefix ending in
/// `\n[truncated]\n`. Returns whether the full text fit.
///
/// # Safety
///
/// `buffer` must point to `buffer_len` writable bytes; `bytes_written`
/// may be null.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_error_write_to_buffer(
    handle: u64,
    buffer: *mut u8,
    buffer_len: usize,
    bytes_written: *mut usize,
) -> bool {
    if buffer.is_null() {
        return false;
    }
    with_context_read(handle, false, |ctx| {
        // SAFETY: buffer spans buffer_len writable bytes per contract.
        let out = unsafe { std::slice::from_raw_parts_mut(buffer, buffer_len) };
        let (written, complete) = ctx.write_error_to_buffer(out);
        if !bytes_written.is_null() {
            // SAFETY: non-null bytes_written is valid per contract.
            unsafe { *bytes_written = written };
        }
        complete
    })
}

/// Process exit code for the current error state (0 = no error).
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_error_as_exit_code(handle: u64) -> i32 {
    with_context_read(handle, 0, Context::error_as_exit_code)
}

/// HTTP status code for the current error state (200 = no error).
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_error_as_http_code(handle: u64) -> i32 {
    with_context_read(handle, 200, Context::error_as_http_code)
}

// ── cancellation ─────────────────────────────────────────────

/// Request cancellation. Lock-free with respect to the operation lock:
/// only the handle table mutex is touched, never the context lock.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_request_cancellation(handle: u64) -> bool {
    match entry(handle) {
        Some((_, cancel)) => {
            cancel.request();
            true
        }
        None => false,
    }
}

// ── JSON endpoints ───────────────────────────────────────────

/// Run a `v1/*` endpoint against the context.
///
/// Returns null for an invalid handle, null method, or non-UTF-8 method
/// string. The response object and its buffer are owned by the context
/// handle and stay valid until it is destroyed.
///
/// # Safety
///
/// `method` must be a valid NUL-terminated string; `json` must point to
/// `json_len` readable bytes (null allowed when `json_len` is 0).
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn rasterflow_context_send_json(
    handle: u64,
    method: *const c_char,
    json: *const u8,
    json_len: usize,
) -> *const RasterflowJsonResponse {
    if method.is_null() || (json.is_null() && json_len > 0) {
        return std::ptr::null();
    }
    // SAFETY: method is NUL-terminated per the caller contract.
    let method = match unsafe { CStr::from_ptr(method) }.to_str() {
        Ok(s) => s.to_string(),
        Err(_) => return std::ptr::null(),
    };
    // SAFETY: json spans json_len readable bytes per the caller contract.
    let body: Vec<u8> = if json_len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(json, json_len) }.to_vec()
    };

    let response = with_context_write(handle, None, |ctx| Some(ctx.send_json(&method, &body)));
    let Some(response) = response else {
        return std::ptr::null();
    };
    let Some(store) = responses(handle) else {
        return std::ptr::null();
    };

    let body = response.body;
    let ffi = Box::new(RasterflowJsonResponse {
        status_code: response.status_code,
        buffer: body.as_ptr(),
        buffer_size: body.len(),
    });
    let pointer: *const RasterflowJsonResponse = &*ffi;
    store
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .push(StoredResponse { _body: body, ffi });
    pointer
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterflow_test_utils::{gradient_raw_image, parse_raw_image};
    use rasterflow_core::PixelFormat;

    fn create() -> u64 {
        let h = rasterflow_context_create(ABI_MAJOR, ABI_MINOR);
        assert_ne!(h, 0);
        h
    }

    #[allow(unsafe_code)]
    fn response_body(response: *const RasterflowJsonResponse) -> (i64, serde_json::Value) {
        assert!(!response.is_null());
        // SAFETY: send_json returned a live context-owned response.
        let response = unsafe { &*response };
        // SAFETY: buffer/buffer_size describe the owned body bytes.
        let bytes =
            unsafe { std::slice::from_raw_parts(response.buffer, response.buffer_size) };
        (
            response.status_code,
            serde_json::from_slice(bytes).unwrap(),
        )
    }

    #[test]
    fn abi_gate_rejects_wrong_major() {
        assert_eq!(rasterflow_context_create(ABI_MAJOR + 1, 0), 0);
        assert_ne!(rasterflow_context_create(ABI_MAJOR, 0), 0);
        assert!(rasterflow_abi_compatible(
            rasterflow_abi_version_major(),
            rasterflow_abi_version_minor()
        ));
    }

    #[test]
    fn create_destroy_lifecycle() {
        let h = create();
        assert!(rasterflow_context_destroy(h));
        // Double destroy and stale use are safe no-ops.
        assert!(!rasterflow_context_destroy(h));
        assert!(!rasterflow_context_has_error(h));
        assert_eq!(rasterflow_context_error_code(h), 0);
    }

    #[test]
    fn destroy_of_null_handle_is_safe() {
        assert!(rasterflow_context_destroy(0));
    }

    #[test]
    fn full_pipeline_through_the_c_surface() {
        let h = create();
        let input = gradient_raw_image(100, 50, PixelFormat::Bgra32);
        assert!(rasterflow_context_add_input_buffer(
            h,
            0,
            input.as_ptr(),
            input.len(),
            RasterflowLifetime::OutlivesFunctionCall as i32,
        ));
        assert!(rasterflow_context_add_output_buffer(h, 1));

        let request = br#"{ "graph": { "nodes": [
            {"type": "decode", "io_id": 0},
            {"type": "scale", "w": 25, "h": 12},
            {"type": "encode", "io_id": 1}
        ]}}"#;
        let method = std::ffi::CString::new("v1/build").unwrap();
        let (status, _) = response_body(rasterflow_context_send_json(
            h,
            method.as_ptr(),
            request.as_ptr(),
            request.len(),
        ));
        assert_eq!(status, 200);

        let method = std::ffi::CString::new("v1/execute").unwrap();
        let empty = b"{}";
        let (status, body) = response_body(rasterflow_context_send_json(
            h,
            method.as_ptr(),
            empty.as_ptr(),
            empty.len(),
        ));
        assert_eq!(status, 200, "execute failed: {body}");

        let mut ptr: *const u8 = std::ptr::null();
        let mut len: usize = 0;
        assert!(rasterflow_context_get_output_buffer_by_id(
            h, 1, &mut ptr, &mut len
        ));
        // SAFETY: ptr/len describe the context-owned output buffer.
        #[allow(unsafe_code)]
        let bytes = unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec();
        let image = parse_raw_image(&bytes);
        assert_eq!((image.width, image.height), (25, 12));
        assert!(!rasterflow_context_has_error(h));

        assert!(rasterflow_context_destroy(h));
    }

    #[test]
    fn duplicate_io_id_sets_the_error_state() {
        let h = create();
        assert!(rasterflow_context_add_output_buffer(h, 3));
        assert!(!rasterflow_context_add_output_buffer(h, 3));
        assert!(rasterflow_context_has_error(h));
        assert_eq!(
            rasterflow_context_error_code(h),
            ErrorKind::InvalidArgument as i32
        );
        assert_eq!(rasterflow_context_error_as_http_code(h), 400);
        assert_eq!(rasterflow_context_error_as_exit_code(h), 64);
        assert!(rasterflow_context_error_recoverable(h));
        assert!(rasterflow_context_error_try_clear(h));
        assert!(!rasterflow_context_has_error(h));
        rasterflow_context_destroy(h);
    }

    #[test]
    fn error_write_truncates_into_small_buffers() {
        let h = create();
        rasterflow_context_add_output_buffer(h, 3);
        rasterflow_context_add_output_buffer(h, 3);

        let mut big = [0u8; 512];
        let mut written = 0usize;
        assert!(rasterflow_context_error_write_to_buffer(
            h,
            big.as_mut_ptr(),
            big.len(),
            &mut written,
        ));
        assert!(written > 0);
        let text = std::str::from_utf8(&big[..written]).unwrap();
        assert!(text.contains("InvalidArgument"));

        let mut small = [0u8; 24];
        assert!(!rasterflow_context_error_write_to_buffer(
            h,
            small.as_mut_ptr(),
            small.len(),
            std::ptr::null_mut(),
        ));
        assert!(std::str::from_utf8(&small)
            .unwrap()
            .ends_with("\n[truncated]\n"));
        rasterflow_context_destroy(h);
    }

    #[test]
    fn cancellation_flips_the_error_state_without_the_write_lock() {
        let h = create();
        assert!(rasterflow_context_request_cancellation(h));
        assert!(rasterflow_context_has_error(h));
        assert_eq!(
            rasterflow_context_error_code(h),
            ErrorKind::OperationCancelled as i32
        );
        assert!(!rasterflow_context_error_recoverable(h));
        assert!(!rasterflow_context_error_try_clear(h));
        rasterflow_context_destroy(h);
    }

    #[test]
    fn send_json_rejects_null_method() {
        let h = create();
        let response =
            rasterflow_context_send_json(h, std::ptr::null(), std::ptr::null(), 0);
        assert!(response.is_null());
        rasterflow_context_destroy(h);
    }

    #[test]
    fn borrowed_input_buffers_are_not_copied() {
        static IMAGE: &[u8] = &[0u8; 4]; // not a real image; registration only
        let h = create();
        assert!(rasterflow_context_add_input_buffer(
            h,
            0,
            IMAGE.as_ptr(),
            IMAGE.len(),
            RasterflowLifetime::OutlivesContext as i32,
        ));
        rasterflow_context_destroy(h);
    }
}

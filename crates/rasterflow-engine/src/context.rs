//! The job context: the only "global" in the system.
//!
//! A [`Context`] owns the bitmap pool, I/O buffers, codec instances and
//! registry, external bitmap references, the error slot, and the
//! cancellation token. Everything it owns dies with it; an empty
//! allocation ledger at drop time is the proof of allocation discipline.
//!
//! Thread-safety lives one layer up: the FFI wraps a context in a
//! read-write lock and keeps a clone of the cancellation token outside it,
//! so `request_cancellation` never blocks on the operation lock.

use std::sync::Arc;

use rasterflow_bitmap::{AllocLedger, BitmapPool, PixelAllocator, SystemAllocator};
use rasterflow_codecs::{CodecRegistry, CodecSlots, InputBytes, IoDirection, IoRegistry};
use rasterflow_core::{
    BitmapId, CallFrame, CancelToken, ErrorKind, ErrorState, FlowError, IoId, PlaceholderId,
};
use rasterflow_nodes::{BitmapRefs, OpContext};

use crate::job::Job;
use crate::json::{self, BuildRequest, JsonResponse};
use crate::passes;

/// ABI major version; callers must match exactly.
pub const ABI_MAJOR: u32 = 1;
/// ABI minor version; callers may require less.
pub const ABI_MINOR: u32 = 0;

/// Whether a caller built against `major.minor` can use this library.
pub fn abi_compatible(major: u32, minor: u32) -> bool {
    major == ABI_MAJOR && minor <= ABI_MINOR
}

/// Owns all engine state with a lifetime.
pub struct Context {
    error: ErrorState,
    cancel: Arc<CancelToken>,
    pool: BitmapPool,
    io: IoRegistry,
    codecs: CodecSlots,
    registry: CodecRegistry,
    bitmap_refs: BitmapRefs,
    job: Option<Job>,
}

impl Context {
    /// A context backed by the system allocator.
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(SystemAllocator))
    }

    /// A context routing all pixel allocations through `allocator`.
    pub fn with_allocator(allocator: Arc<dyn PixelAllocator>) -> Self {
        Self {
            error: ErrorState::new(),
            cancel: Arc::new(CancelToken::new()),
            pool: BitmapPool::with_allocator(allocator),
            io: IoRegistry::new(),
            codecs: CodecSlots::new(),
            registry: CodecRegistry::with_builtins(),
            bitmap_refs: BitmapRefs::new(),
            job: None,
        }
    }

    fn record<T>(&mut self, result: Result<T, FlowError>) -> Result<T, FlowError> {
        if let Err(e) = &result {
            self.error.raise(e.clone());
        }
        result
    }

    // ── cancellation ─────────────────────────────────────────

    /// The shared cancellation token (cloned by the FFI so cancellation
    /// never takes the operation lock).
    pub fn cancel_token(&self) -> Arc<CancelToken> {
        Arc::clone(&self.cancel)
    }

    /// Request cancellation. Lock-free, idempotent, unrecoverable.
    pub fn request_cancellation(&self) {
        self.cancel.request();
    }

    // ── error state ──────────────────────────────────────────

    /// Whether the context is in an errored state (a set error or a
    /// requested cancellation).
    pub fn has_error(&self) -> bool {
        self.error.has_error() || self.cancel.is_cancelled()
    }

    /// The effective error kind, accounting for cancellation.
    fn effective_kind(&self) -> Option<ErrorKind> {
        match self.error.current() {
            Some(e) => Some(e.kind),
            None if self.cancel.is_cancelled() => Some(ErrorKind::OperationCancelled),
            None => None,
        }
    }

    /// ABI-stable error code; 0 when no error.
    pub fn error_code(&self) -> i32 {
        self.effective_kind().map_or(0, |k| k as i32)
    }

    /// Whether the current error (if any) may be cleared.
    pub fn error_recoverable(&self) -> bool {
        self.effective_kind().is_none_or(ErrorKind::recoverable)
    }

    /// Clear a recoverable error. Cancellation never clears.
    pub fn try_clear_error(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.error.try_clear()
    }

    /// The stored error, if any.
    pub fn current_error(&self) -> Option<&FlowError> {
        self.error.current()
    }

    /// Record an error on the context (see [`ErrorState::raise`]).
    pub fn raise_error(&mut self, error: FlowError) {
        self.error.raise(error);
    }

    /// Append a frame to the current error's callstack; no-op otherwise.
    pub fn add_to_callstack(&mut self, frame: CallFrame) {
        self.error.add_frame(frame);
    }

    /// Render the error state into `buffer`.
    ///
    /// Returns `(bytes_written, complete)`. When the buffer is too small
    /// the text is truncated and `\n[truncated]\n` replaces the tail.
    pub fn write_error_to_buffer(&self, buffer: &mut [u8]) -> (usize, bool) {
        let mut text = String::new();
        match self.error.current() {
            Some(e) => e.write_with_stacktrace(&mut text),
            None if self.cancel.is_cancelled() => {
                text.push_str("OperationCancelled (100): cancellation requested");
            }
            None => text.push_str("No error"),
        }
        let bytes = text.as_bytes();
        if bytes.len() <= buffer.len() {
            buffer[..bytes.len()].copy_from_slice(bytes);
            return (bytes.len(), true);
        }
        const MARKER: &[u8] = b"\n[truncated]\n";
        if buffer.len() <= MARKER.len() {
            let n = buffer.len();
            buffer.copy_from_slice(&MARKER[MARKER.len() - n..]);
            return (n, false);
        }
        let keep = buffer.len() - MARKER.len();
        buffer[..keep].copy_from_slice(&bytes[..keep]);
        buffer[keep..].copy_from_slice(MARKER);
        (buffer.len(), false)
    }

    /// Process exit code for the current error state (0 = no error).
    pub fn error_as_exit_code(&self) -> i32 {
        self.effective_kind().map_or(0, ErrorKind::exit_code)
    }

    /// HTTP status code for the current error state (200 = no error).
    pub fn error_as_http_code(&self) -> i32 {
        self.effective_kind().map_or(200, ErrorKind::http_code)
    }

    // ── I/O and resources ────────────────────────────────────

    /// Register an input buffer under a unique `io_id`.
    pub fn add_input_buffer(&mut self, io_id: IoId, bytes: InputBytes) -> Result<(), FlowError> {
        let result = self.io.add_input_buffer(io_id, bytes);
        self.record(result)
    }

    /// Register a growable, context-owned output buffer.
    pub fn add_output_buffer(&mut self, io_id: IoId) -> Result<(), FlowError> {
        let result = self.io.add_output_buffer(io_id);
        self.record(result)
    }

    /// Read an output buffer's current contents. Valid until the context
    /// is destroyed or the buffer is rewritten.
    pub fn get_output_buffer(&self, io_id: IoId) -> Result<&[u8], FlowError> {
        self.io.output_bytes(io_id)
    }

    /// Add an external bitmap reference slot (for bitmap-pointer nodes).
    pub fn add_bitmap_reference(&mut self, initial: Option<BitmapId>) -> u32 {
        self.bitmap_refs.add(initial)
    }

    /// The bitmap currently referenced by `slot`.
    pub fn bitmap_reference(&self, slot: u32) -> Result<Option<BitmapId>, FlowError> {
        self.bitmap_refs.get(slot)
    }

    /// The bitmap pool (tests and embedders build source bitmaps here).
    pub fn pool(&self) -> &BitmapPool {
        &self.pool
    }

    /// The bitmap pool, mutably.
    pub fn pool_mut(&mut self) -> &mut BitmapPool {
        &mut self.pool
    }

    /// The codec registry, for installing PNG/JPEG/GIF implementations.
    pub fn codec_registry_mut(&mut self) -> &mut CodecRegistry {
        &mut self.registry
    }

    /// The allocation ledger shared with every pixel buffer.
    pub fn allocation_ledger(&self) -> Arc<AllocLedger> {
        Arc::clone(self.pool.ledger())
    }

    // ── job execution ────────────────────────────────────────

    /// Run `job` to completion against this context's resources.
    ///
    /// Failures are recorded on the context and returned.
    pub fn execute_job(&mut self, job: &mut Job) -> Result<(), FlowError> {
        let max_passes = job.max_passes();
        let result = {
            let (graph, resources, rec) = job.split_mut();
            let mut op = OpContext {
                pool: &mut self.pool,
                io: &mut self.io,
                codecs: &mut self.codecs,
                registry: &self.registry,
                bitmap_refs: &mut self.bitmap_refs,
                cancel: self.cancel.as_ref(),
            };
            passes::run_job(&mut op, graph, resources, rec, max_passes)
        };
        self.record(result)
    }

    /// The job built by the last `v1/build`, if any.
    pub fn built_job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    // ── JSON endpoints ───────────────────────────────────────

    /// Run a `v1/*` endpoint. Errors are recorded on the context and
    /// reported in the response body with their HTTP status.
    pub fn send_json(&mut self, method: &str, body: &[u8]) -> JsonResponse {
        match self.dispatch(method, body) {
            Ok(response) => response,
            Err(e) => {
                // execute_job records its own failures; don't double-raise.
                let recorded = self.error.current().is_some_and(|cur| cur.kind == e.kind);
                if !recorded {
                    self.error.raise(e.clone());
                }
                json::error_response(&e)
            }
        }
    }

    fn dispatch(&mut self, method: &str, body: &[u8]) -> Result<JsonResponse, FlowError> {
        match method {
            "v1/get_version_info" => Ok(json::ok_response(serde_json::json!({
                "version_info": {
                    "long_version_string": concat!("rasterflow ", env!("CARGO_PKG_VERSION")),
                    "abi_major": ABI_MAJOR,
                    "abi_minor": ABI_MINOR,
                }
            }))),
            "v1/build" => {
                let request: BuildRequest = serde_json::from_slice(body).map_err(|e| {
                    FlowError::new(
                        ErrorKind::InvalidArgument,
                        format!("malformed build request: {e}"),
                    )
                })?;
                let graph = json::build_graph(&request.graph)?;
                let mut job = Job::new(graph);
                for binding in &request.io {
                    let io_id = IoId(binding.io_id);
                    let direction = self.io.direction(io_id).ok_or_else(|| {
                        FlowError::new(
                            ErrorKind::PrimaryResourceNotFound,
                            format!("io_id {io_id} is not registered on this context"),
                        )
                    })?;
                    job.add_buffer_resource(
                        PlaceholderId(binding.placeholder_id),
                        direction,
                        io_id,
                        None,
                    );
                }
                let job_id = job.debug_id();
                self.job = Some(job);
                Ok(json::ok_response(serde_json::json!({ "job_id": job_id })))
            }
            "v1/execute" => {
                let mut job = self.job.take().ok_or_else(|| {
                    FlowError::new(
                        ErrorKind::InvalidArgument,
                        "no job has been built on this context",
                    )
                })?;
                let result = self.execute_job(&mut job);
                self.job = Some(job);
                result?;

                let outputs: Vec<serde_json::Value> = self
                    .io
                    .ids()
                    .filter(|&id| self.io.direction(id) == Some(IoDirection::Out))
                    .map(|id| {
                        let bytes = self.io.output_bytes(id).map_or(0, <[u8]>::len);
                        serde_json::json!({ "io_id": id.0, "bytes": bytes })
                    })
                    .collect();
                Ok(json::ok_response(serde_json::json!({ "io": outputs })))
            }
            other => Err(FlowError::new(
                ErrorKind::PrimaryResourceNotFound,
                format!("unknown endpoint {other}"),
            )),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abi_check_requires_exact_major_and_lesser_minor() {
        assert!(abi_compatible(ABI_MAJOR, ABI_MINOR));
        assert!(abi_compatible(ABI_MAJOR, 0));
        assert!(!abi_compatible(ABI_MAJOR, ABI_MINOR + 1));
        assert!(!abi_compatible(ABI_MAJOR + 1, 0));
    }

    #[test]
    fn fresh_context_reports_no_error() {
        let ctx = Context::new();
        assert!(!ctx.has_error());
        assert_eq!(ctx.error_code(), 0);
        assert_eq!(ctx.error_as_exit_code(), 0);
        assert_eq!(ctx.error_as_http_code(), 200);
        assert!(ctx.error_recoverable());
    }

    #[test]
    fn cancellation_is_an_error_state_without_the_lock() {
        let ctx = Context::new();
        ctx.request_cancellation();
        assert!(ctx.has_error());
        assert_eq!(ctx.error_code(), ErrorKind::OperationCancelled as i32);
        assert!(!ctx.error_recoverable());
        assert_eq!(ctx.error_as_http_code(), 499);
        assert_eq!(ctx.error_as_exit_code(), 130);
    }

    #[test]
    fn cancelled_context_cannot_clear() {
        let mut ctx = Context::new();
        ctx.request_cancellation();
        assert!(!ctx.try_clear_error());
        assert!(ctx.has_error());
    }

    #[test]
    fn recoverable_errors_clear() {
        let mut ctx = Context::new();
        ctx.raise_error(FlowError::new(ErrorKind::InvalidArgument, "bad crop"));
        assert!(ctx.has_error());
        assert!(ctx.error_recoverable());
        assert!(ctx.try_clear_error());
        assert!(!ctx.has_error());
    }

    #[test]
    fn error_buffer_write_is_truncation_safe() {
        let mut ctx = Context::new();
        ctx.raise_error(FlowError::new(
            ErrorKind::IoError,
            "a moderately long error message for truncation",
        ));

        let mut big = [0u8; 512];
        let (n, complete) = ctx.write_error_to_buffer(&mut big);
        assert!(complete);
        let text = std::str::from_utf8(&big[..n]).unwrap();
        assert!(text.contains("IoError (20)"));
        assert!(text.contains("at "));

        let mut small = [0u8; 32];
        let (n, complete) = ctx.write_error_to_buffer(&mut small);
        assert!(!complete);
        assert_eq!(n, 32);
        assert!(std::str::from_utf8(&small)
            .unwrap()
            .ends_with("\n[truncated]\n"));
    }

    #[test]
    fn empty_error_buffer_write_says_no_error() {
        let ctx = Context::new();
        let mut buf = [0u8; 64];
        let (n, complete) = ctx.write_error_to_buffer(&mut buf);
        assert!(complete);
        assert_eq!(&buf[..n], b"No error");
    }

    #[test]
    fn version_info_endpoint_reports_abi() {
        let mut ctx = Context::new();
        let response = ctx.send_json("v1/get_version_info", b"{}");
        assert_eq!(response.status_code, 200);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["version_info"]["abi_major"], 1);
    }

    #[test]
    fn unknown_endpoint_is_404() {
        let mut ctx = Context::new();
        let response = ctx.send_json("v2/nonsense", b"{}");
        assert_eq!(response.status_code, 404);
        assert!(ctx.has_error());
        assert_eq!(
            ctx.error_code(),
            ErrorKind::PrimaryResourceNotFound as i32
        );
    }

    #[test]
    fn execute_without_build_is_a_client_error() {
        let mut ctx = Context::new();
        let response = ctx.send_json("v1/execute", b"{}");
        assert_eq!(response.status_code, 400);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "InvalidArgument");
    }

    #[test]
    fn malformed_build_body_is_a_client_error() {
        let mut ctx = Context::new();
        let response = ctx.send_json("v1/build", b"{\"graph\": 7}");
        assert_eq!(response.status_code, 400);
    }
}

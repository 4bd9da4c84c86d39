//! C FFI for the rasterflow engine.
//!
//! Contexts are addressed by slot+generation `u64` handles (never zero),
//! so stale and double-destroyed handles fail safely instead of causing
//! UB. Every entry point catches panics and converts them to the
//! `InternalError` class; the process never aborts through this boundary.
//!
//! Thread-safety: each context sits behind its own read-write lock.
//! State-mutating calls take the write lock, status queries the read
//! lock, and `rasterflow_context_request_cancellation` touches only an
//! atomic flag shared outside the lock.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

mod handle;

pub mod api;

pub use api::RasterflowJsonResponse;

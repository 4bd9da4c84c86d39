//! The rasterflow job engine.
//!
//! [`Context`] owns everything with a lifetime: bitmap pool, I/O buffers,
//! codec instances, the error state, and the cancellation token. A [`Job`]
//! owns one operation graph plus its resources and recording flags. The
//! [`passes`] module drives the fixpoint loop (propagate dimensions,
//! flatten, optimize, flatten again, execute) until every node has run or
//! the pass limit trips.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod binder;
pub mod context;
pub mod job;
pub mod json;
pub mod passes;
pub mod recording;

pub use context::{abi_compatible, Context, ABI_MAJOR, ABI_MINOR};
pub use job::{Job, JobResource, ResourceKind};
pub use json::JsonResponse;
pub use recording::{FrameSink, RecordingConfig};

//! Core types for the rasterflow image processing engine.
//!
//! This is the leaf crate with zero internal rasterflow dependencies. It
//! defines the vocabulary shared by the whole workspace: typed IDs, the
//! error taxonomy and the context error-state machine, the cancellation
//! token, and the pixel/filter enums.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod codec;
pub mod error;
pub mod id;
pub mod pixels;

// Re-export core types at crate root for convenience.
pub use cancel::CancelToken;
pub use codec::CodecKind;
pub use error::{CallFrame, ErrorKind, ErrorState, FlowError};
pub use id::{BitmapId, CodecSlotId, EdgeId, IoId, NodeId, ParamsId, PlaceholderId};
pub use pixels::{CompositingMode, Filter, Floatspace, PixelFormat};

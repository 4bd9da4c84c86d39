//! Codec capability interfaces and I/O buffer management.
//!
//! The engine consumes decoders and encoders through the [`Decoder`] and
//! [`Encoder`] traits; concrete PNG/JPEG/GIF implementations are installed
//! by the embedder via the [`CodecRegistry`]. A raw, uncompressed bitmap
//! container ships built-in for tests and demos. Codec instances are
//! created lazily and cached in a job context's [`CodecSlots`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod io;
pub mod raw;
pub mod registry;
pub mod slots;

pub use codec::{Decoder, Encoder, FrameInfo};
pub use io::{InputBytes, IoDirection, IoRegistry};
pub use raw::{RawDecoder, RawEncoder};
pub use registry::CodecRegistry;
pub use slots::{CodecInstance, CodecSlots};

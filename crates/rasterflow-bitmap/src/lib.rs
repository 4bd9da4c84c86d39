//! Bitmap storage for the rasterflow engine.
//!
//! All pixel memory lives in a job-owned [`BitmapPool`], addressed by
//! `BitmapId`. Bitmaps either own their buffer (allocated through the
//! pluggable [`PixelAllocator`] and tracked in the [`AllocLedger`]) or are
//! *windows*: header-only aliases into another bitmap's buffer, used by
//! the crop-in-place primitive. Windows reference their owner by ID, never
//! by pointer, so pool growth and structural edits are always safe.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod alloc;
pub mod bitmap;
pub mod pool;
pub mod view;

pub use alloc::{AllocLedger, PixelAllocator, SystemAllocator, TrackedBuffer};
pub use bitmap::{Bitmap, PixelBuf};
pub use pool::BitmapPool;
pub use view::{BitmapLayout, PixelView, PixelViewMut};

//! Pixel kernels consumed by the graph executor.
//!
//! Everything here operates on resolved [`PixelView`]s: no graph, pool,
//! or codec knowledge. The executor is the only caller.
//!
//! [`PixelView`]: rasterflow_bitmap::PixelView

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod colorspace;
pub mod primitives;
pub mod scale1d;
pub mod weights;

pub use primitives::{copy_rect, flip_horizontal, flip_vertical, CopyRect};
pub use scale1d::{render_to_canvas_1d, RenderOptions};
pub use weights::{compute_contribs, LineContribs, PixelWeights};

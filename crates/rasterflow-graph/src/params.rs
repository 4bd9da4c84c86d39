//! Typed node parameters.
//!
//! The original byte-blob "info bytes" become one [`NodeParams`] value per
//! node, held in the graph's append-only parameter arena. Entries are
//! mutable in place (codec slots bind lazily) but never move, so a
//! `ParamsId` captured before a rewrite still resolves afterwards.

use rasterflow_core::{
    CodecKind, CodecSlotId, CompositingMode, Filter, Floatspace, IoId, PixelFormat, PlaceholderId,
};

/// Parameters for one 1-D resampling pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Render1DParams {
    /// Target width of the resampled rows.
    pub scale_to_width: u32,
    /// Write output rows as canvas columns (transposing on the way out).
    pub transpose_on_write: bool,
    /// Horizontal placement of the output within the canvas.
    pub canvas_x: u32,
    /// Vertical placement of the output within the canvas.
    pub canvas_y: u32,
    /// Interpolation filter.
    pub filter: Filter,
    /// Colorspace for the resampling arithmetic.
    pub floatspace: Floatspace,
    /// Percentage of sharpening to apply to resampled rows (0 = none).
    pub sharpen_percent_goal: f32,
    /// How output pixels combine with existing canvas content.
    pub compositing: CompositingMode,
    /// Matte color for matte compositing.
    pub matte_color: [u8; 4],
}

impl Render1DParams {
    /// A pass with engine defaults: overwrite compositing, linear
    /// floatspace, no sharpening.
    pub fn new(scale_to_width: u32, transpose_on_write: bool, filter: Filter) -> Self {
        Self {
            scale_to_width,
            transpose_on_write,
            canvas_x: 0,
            canvas_y: 0,
            filter,
            floatspace: Floatspace::Linear,
            sharpen_percent_goal: 0.0,
            compositing: CompositingMode::ReplaceSelf,
            matte_color: [0; 4],
        }
    }
}

/// Source and destination rectangles for a canvas blit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyRectParams {
    /// Left edge of the source rectangle.
    pub from_x: u32,
    /// Top edge of the source rectangle.
    pub from_y: u32,
    /// Left placement on the canvas.
    pub x: u32,
    /// Top placement on the canvas.
    pub y: u32,
    /// Rectangle width.
    pub width: u32,
    /// Rectangle height.
    pub height: u32,
}

/// Codec binding for decoder/encoder nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecParams {
    /// The I/O buffer this codec reads or writes.
    pub io_id: IoId,
    /// Requested container format. `None` on decoders means "detect by
    /// signature".
    pub kind: Option<CodecKind>,
    /// Codec instance slot, populated on first access.
    pub slot: Option<CodecSlotId>,
}

/// Node-specific parameters, one value per node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeParams {
    /// The node needs no parameters.
    None,
    /// Target dimensions (scale).
    Size {
        /// Target width.
        width: u32,
        /// Target height.
        height: u32,
    },
    /// Crop rectangle, exclusive on the far edges.
    Crop {
        /// Left edge (inclusive).
        x1: u32,
        /// Top edge (inclusive).
        y1: u32,
        /// Right edge (exclusive).
        x2: u32,
        /// Bottom edge (exclusive).
        y2: u32,
    },
    /// Canvas allocation request.
    CreateCanvas {
        /// Pixel format of the canvas.
        format: PixelFormat,
        /// Canvas width.
        width: u32,
        /// Canvas height.
        height: u32,
    },
    /// 1-D resampling pass.
    Render1D(Render1DParams),
    /// Canvas blit rectangles.
    CopyRect(CopyRectParams),
    /// Resource placeholder index.
    Placeholder {
        /// The number job resources match against.
        index: PlaceholderId,
    },
    /// Codec binding.
    Codec(CodecParams),
    /// External bitmap reference slot in the job's resource table.
    BitmapRef {
        /// Index into the job's bitmap-reference table.
        slot: u32,
    },
}

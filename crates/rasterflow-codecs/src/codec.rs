//! Decoder and encoder capability traits.

use rasterflow_bitmap::{PixelView, PixelViewMut};
use rasterflow_core::{FlowError, PixelFormat};

use crate::io::IoRegistry;

/// What a decoder reports about the frame it will produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format the frame decodes into.
    pub format: PixelFormat,
    /// Whether the decoded alpha channel carries real data.
    pub alpha_meaningful: bool,
}

/// Reads one frame out of an input buffer.
///
/// Instances are bound to their `IoId` at creation and may cache parse
/// state between [`frame_info`](Decoder::frame_info) and
/// [`read_frame`](Decoder::read_frame). `Send + Sync` because contexts
/// (and the codec instances they own) sit behind the FFI's read-write
/// lock and may cross threads.
pub trait Decoder: Send + Sync + std::fmt::Debug {
    /// Dimensions and format of the frame, without decoding pixels.
    fn frame_info(&mut self, io: &IoRegistry) -> Result<FrameInfo, FlowError>;

    /// Decode pixels into `frame`, whose layout matches
    /// [`frame_info`](Decoder::frame_info).
    fn read_frame(
        &mut self,
        io: &IoRegistry,
        frame: &mut PixelViewMut<'_>,
    ) -> Result<(), FlowError>;
}

/// Writes one frame into an output buffer.
pub trait Encoder: Send + Sync + std::fmt::Debug {
    /// Encode `frame` and append the bytes to the bound output buffer.
    fn write_frame(&mut self, io: &mut IoRegistry, frame: &PixelView<'_>)
        -> Result<(), FlowError>;
}

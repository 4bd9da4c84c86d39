//! The built-in raw bitmap container.
//!
//! Layout: 4-byte magic `rfb1`, width and height as little-endian `u32`,
//! one format code byte, one alpha-meaningful byte, then rows packed at
//! `width * bytes_per_pixel` with no padding. Lossless by construction.

use rasterflow_bitmap::{PixelView, PixelViewMut};
use rasterflow_core::{ErrorKind, FlowError, IoId, PixelFormat};

use crate::codec::{Decoder, Encoder, FrameInfo};
use crate::io::IoRegistry;

/// Magic bytes opening a raw bitmap stream.
pub const RAW_MAGIC: [u8; 4] = *b"rfb1";

const HEADER_LEN: usize = 14;

/// Decoder for the raw container.
#[derive(Debug)]
pub struct RawDecoder {
    io_id: IoId,
    info: Option<FrameInfo>,
}

impl RawDecoder {
    /// A decoder reading from `io_id`.
    pub fn new(io_id: IoId) -> Self {
        Self { io_id, info: None }
    }

    fn parse_header(&mut self, io: &IoRegistry) -> Result<FrameInfo, FlowError> {
        if let Some(info) = self.info {
            return Ok(info);
        }
        let bytes = io.input_bytes(self.io_id)?;
        if bytes.len() < HEADER_LEN || bytes[..4] != RAW_MAGIC {
            return Err(FlowError::new(
                ErrorKind::ImageMalformed,
                format!("io_id {} is not a raw bitmap stream", self.io_id),
            ));
        }
        let width = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let height = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let format = PixelFormat::from_code(bytes[12]).ok_or_else(|| {
            FlowError::new(
                ErrorKind::ImageMalformed,
                format!("raw bitmap header carries unknown format code {}", bytes[12]),
            )
        })?;
        if width == 0 || height == 0 {
            return Err(FlowError::new(
                ErrorKind::ImageMalformed,
                "raw bitmap header declares zero dimensions",
            ));
        }
        let payload = width as usize * format.bytes_per_pixel() as usize * height as usize;
        if bytes.len() < HEADER_LEN + payload {
            return Err(FlowError::new(
                ErrorKind::ImageMalformed,
                format!(
                    "raw bitmap payload truncated: need {payload} bytes, have {}",
                    bytes.len() - HEADER_LEN
                ),
            ));
        }
        let info = FrameInfo {
            width,
            height,
            format,
            alpha_meaningful: bytes[13] != 0,
        };
        self.info = Some(info);
        Ok(info)
    }
}

impl Decoder for RawDecoder {
    fn frame_info(&mut self, io: &IoRegistry) -> Result<FrameInfo, FlowError> {
        self.parse_header(io)
    }

    fn read_frame(
        &mut self,
        io: &IoRegistry,
        frame: &mut PixelViewMut<'_>,
    ) -> Result<(), FlowError> {
        let info = self.parse_header(io)?;
        if frame.layout.width != info.width
            || frame.layout.height != info.height
            || frame.layout.format != info.format
        {
            return Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                "decode target does not match the declared frame info",
            ));
        }
        let bytes = io.input_bytes(self.io_id)?;
        let row_len = info.width as usize * info.format.bytes_per_pixel() as usize;
        for y in 0..info.height {
            let start = HEADER_LEN + y as usize * row_len;
            frame
                .row_mut(y)
                .copy_from_slice(&bytes[start..start + row_len]);
        }
        Ok(())
    }
}

/// Encoder for the raw container.
#[derive(Debug)]
pub struct RawEncoder {
    io_id: IoId,
}

impl RawEncoder {
    /// An encoder appending to `io_id`.
    pub fn new(io_id: IoId) -> Self {
        Self { io_id }
    }
}

impl Encoder for RawEncoder {
    fn write_frame(
        &mut self,
        io: &mut IoRegistry,
        frame: &PixelView<'_>,
    ) -> Result<(), FlowError> {
        let layout = frame.layout;
        let out = io.output_mut(self.io_id)?;
        out.clear();
        out.extend_from_slice(&RAW_MAGIC);
        out.extend_from_slice(&layout.width.to_le_bytes());
        out.extend_from_slice(&layout.height.to_le_bytes());
        out.push(layout.format as u8);
        out.push(u8::from(frame.alpha_meaningful));
        for y in 0..layout.height {
            out.extend_from_slice(frame.row(y));
        }
        Ok(())
    }
}

/// Encode a pixel region into a raw bitmap byte vector directly. Test and
/// fixture helper.
pub fn encode_raw(frame: &PixelView<'_>) -> Vec<u8> {
    let layout = frame.layout;
    let mut out = Vec::with_capacity(HEADER_LEN + layout.span_bytes());
    out.extend_from_slice(&RAW_MAGIC);
    out.extend_from_slice(&layout.width.to_le_bytes());
    out.extend_from_slice(&layout.height.to_le_bytes());
    out.push(layout.format as u8);
    out.push(u8::from(frame.alpha_meaningful));
    for y in 0..layout.height {
        out.extend_from_slice(frame.row(y));
    }
    out
}

//! Test image builders and fault-injection helpers.

use std::sync::atomic::{AtomicUsize, Ordering};

use rasterflow_bitmap::{BitmapLayout, PixelAllocator, PixelView};
use rasterflow_codecs::raw::{encode_raw, RAW_MAGIC};
use rasterflow_core::PixelFormat;

/// A decoded raw-container image, for asserting on engine outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Alpha-meaningful flag from the header.
    pub alpha_meaningful: bool,
    /// Tightly packed pixel rows.
    pub pixels: Vec<u8>,
}

impl RawImage {
    /// Byte offset of pixel `(x, y)`.
    fn offset(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize * self.format.bytes_per_pixel() as usize
    }

    /// The bytes of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel() as usize;
        let at = self.offset(x, y);
        &self.pixels[at..at + bpp]
    }
}

/// Parse a raw-container byte stream produced by the engine.
///
/// Panics on malformed input; fixtures, not production.
pub fn parse_raw_image(bytes: &[u8]) -> RawImage {
    assert!(bytes.len() >= 14, "raw stream shorter than its header");
    assert_eq!(&bytes[..4], &RAW_MAGIC, "missing raw container magic");
    let width = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let height = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let format = PixelFormat::from_code(bytes[12]).expect("unknown format code");
    let alpha_meaningful = bytes[13] != 0;
    let payload = (width * height * format.bytes_per_pixel()) as usize;
    RawImage {
        width,
        height,
        format,
        alpha_meaningful,
        pixels: bytes[14..14 + payload].to_vec(),
    }
}

fn packed_layout(width: u32, height: u32, format: PixelFormat) -> BitmapLayout {
    BitmapLayout {
        width,
        height,
        stride: width * format.bytes_per_pixel(),
        format,
    }
}

/// A deterministic gradient image in the raw container.
///
/// Every pixel byte is a function of its coordinates, so transforms with
/// known geometry (flips, rotates, crops) can be asserted pixel-exactly.
pub fn gradient_raw_image(width: u32, height: u32, format: PixelFormat) -> Vec<u8> {
    let bpp = format.bytes_per_pixel();
    let mut pixels = vec![0u8; (width * height * bpp) as usize];
    for y in 0..height {
        for x in 0..width {
            for c in 0..bpp {
                let at = ((y * width + x) * bpp + c) as usize;
                pixels[at] = gradient_byte(x, y, c);
            }
        }
    }
    let alpha = format == PixelFormat::Bgra32;
    encode_raw(&PixelView::new(
        packed_layout(width, height, format),
        alpha,
        &pixels,
    ))
}

/// The byte value `gradient_raw_image` puts at `(x, y)` channel `c`.
pub fn gradient_byte(x: u32, y: u32, c: u32) -> u8 {
    (x.wrapping_mul(7) ^ y.wrapping_mul(13)).wrapping_add(c * 31) as u8
}

/// A single-valued gray8 image in the raw container.
pub fn solid_gray_raw_image(width: u32, height: u32, value: u8) -> Vec<u8> {
    let pixels = vec![value; (width * height) as usize];
    encode_raw(&PixelView::new(
        packed_layout(width, height, PixelFormat::Gray8),
        false,
        &pixels,
    ))
}

/// Allocator that succeeds a fixed number of times, then refuses.
///
/// Drives the out-of-memory scenarios without exhausting real memory.
pub struct FailingAllocator {
    remaining: AtomicUsize,
}

impl FailingAllocator {
    /// Allow `successes` allocations before failing.
    pub fn after(successes: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(successes),
        }
    }
}

impl PixelAllocator for FailingAllocator {
    fn alloc_zeroed(&self, bytes: usize) -> Option<Vec<u8>> {
        let mut current = self.remaining.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return None;
            }
            match self.remaining.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(vec![0u8; bytes]),
                Err(seen) => current = seen,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_round_trips_through_parse() {
        let bytes = gradient_raw_image(4, 3, PixelFormat::Bgra32);
        let image = parse_raw_image(&bytes);
        assert_eq!((image.width, image.height), (4, 3));
        assert_eq!(image.format, PixelFormat::Bgra32);
        assert_eq!(image.pixel(2, 1)[0], gradient_byte(2, 1, 0));
        assert_eq!(image.pixel(2, 1)[3], gradient_byte(2, 1, 3));
    }

    #[test]
    fn failing_allocator_counts_down() {
        let alloc = FailingAllocator::after(2);
        assert!(alloc.alloc_zeroed(8).is_some());
        assert!(alloc.alloc_zeroed(8).is_some());
        assert!(alloc.alloc_zeroed(8).is_none());
        assert!(alloc.alloc_zeroed(8).is_none());
    }
}

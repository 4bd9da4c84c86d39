//! In-place flips and the canvas blit.

use rasterflow_bitmap::{PixelView, PixelViewMut};
use rasterflow_core::{ErrorKind, FlowError};

/// Mirror the rows of `view` in place.
pub fn flip_vertical(view: &mut PixelViewMut<'_>) {
    let h = view.layout.height;
    for y in 0..h / 2 {
        let (top, bottom) = view.row_pair_mut(y, h - 1 - y);
        top.swap_with_slice(bottom);
    }
}

/// Mirror each row of `view` pixel-wise in place.
pub fn flip_horizontal(view: &mut PixelViewMut<'_>) {
    let bpp = view.layout.format.bytes_per_pixel() as usize;
    let w = view.layout.width as usize;
    for y in 0..view.layout.height {
        let row = view.row_mut(y);
        for x in 0..w / 2 {
            let (a, b) = (x * bpp, (w - 1 - x) * bpp);
            for i in 0..bpp {
                row.swap(a + i, b + i);
            }
        }
    }
}

/// Rectangle pair for [`copy_rect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyRect {
    /// Left edge of the source rectangle.
    pub from_x: u32,
    /// Top edge of the source rectangle.
    pub from_y: u32,
    /// Left placement on the destination.
    pub x: u32,
    /// Top placement on the destination.
    pub y: u32,
    /// Rectangle width.
    pub width: u32,
    /// Rectangle height.
    pub height: u32,
}

/// Copy a rectangle of `src` onto `dst`.
///
/// Formats must match. When the rectangle covers both bitmaps entirely
/// and strides agree, the whole span is copied at once; otherwise rows
/// are copied one at a time.
pub fn copy_rect(
    src: &PixelView<'_>,
    dst: &mut PixelViewMut<'_>,
    rect: CopyRect,
) -> Result<(), FlowError> {
    if src.layout.format != dst.layout.format {
        return Err(FlowError::new(
            ErrorKind::InvalidArgument,
            format!(
                "copy source format {} does not match canvas format {}",
                src.layout.format, dst.layout.format
            ),
        ));
    }
    if rect.from_x + rect.width > src.layout.width
        || rect.from_y + rect.height > src.layout.height
        || rect.x + rect.width > dst.layout.width
        || rect.y + rect.height > dst.layout.height
    {
        return Err(FlowError::new(
            ErrorKind::InvalidArgument,
            format!(
                "copy rect {}x{} out of bounds for {}x{} -> {}x{}",
                rect.width,
                rect.height,
                src.layout.width,
                src.layout.height,
                dst.layout.width,
                dst.layout.height
            ),
        ));
    }

    let full_cover = rect.from_x == 0
        && rect.from_y == 0
        && rect.x == 0
        && rect.y == 0
        && rect.width == src.layout.width
        && rect.width == dst.layout.width
        && rect.height == src.layout.height
        && rect.height == dst.layout.height
        && src.layout.stride == dst.layout.stride;
    if full_cover {
        let span = src.layout.span_bytes();
        dst.data_mut()[..span].copy_from_slice(&src.data()[..span]);
        return Ok(());
    }

    let bpp = src.layout.format.bytes_per_pixel() as usize;
    let row_len = rect.width as usize * bpp;
    for y in 0..rect.height {
        let src_row = src.row(rect.from_y + y);
        let src_start = rect.from_x as usize * bpp;
        let dst_row = dst.row_mut(rect.y + y);
        let dst_start = rect.x as usize * bpp;
        dst_row[dst_start..dst_start + row_len]
            .copy_from_slice(&src_row[src_start..src_start + row_len]);
    }
    Ok(())
}

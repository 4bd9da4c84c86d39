//! Resolved pixel views handed to kernels and codecs.
//!
//! A view pairs a byte slice (already offset to the bitmap's first pixel)
//! with the [`BitmapLayout`] needed to address rows within it. Kernels
//! never see the pool or window indirection.

use rasterflow_core::PixelFormat;

/// Dimensions and addressing of a pixel region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapLayout {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row stride in bytes (of the backing buffer, not the region).
    pub stride: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl BitmapLayout {
    /// Meaningful bytes per row (`width * bytes_per_pixel`).
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel() as usize
    }

    /// Bytes spanned from the first pixel to the end of the last row.
    pub fn span_bytes(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        (self.height as usize - 1) * self.stride as usize + self.row_bytes()
    }
}

/// Read-only pixel region.
#[derive(Debug)]
pub struct PixelView<'a> {
    /// Region layout.
    pub layout: BitmapLayout,
    /// Whether the region's alpha channel carries real data.
    pub alpha_meaningful: bool,
    pub(crate) data: &'a [u8],
}

impl<'a> PixelView<'a> {
    /// Construct a view over `data`, which must start at the region's
    /// first pixel and span at least [`BitmapLayout::span_bytes`].
    pub fn new(layout: BitmapLayout, alpha_meaningful: bool, data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= layout.span_bytes());
        Self {
            layout,
            alpha_meaningful,
            data,
        }
    }

    /// The meaningful bytes of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.layout.stride as usize;
        &self.data[start..start + self.layout.row_bytes()]
    }

    /// The entire backing span.
    pub fn data(&self) -> &[u8] {
        self.data
    }
}

/// Mutable pixel region.
#[derive(Debug)]
pub struct PixelViewMut<'a> {
    /// Region layout.
    pub layout: BitmapLayout,
    pub(crate) data: &'a mut [u8],
}

impl<'a> PixelViewMut<'a> {
    /// Construct a mutable view; same contract as [`PixelView::new`].
    pub fn new(layout: BitmapLayout, data: &'a mut [u8]) -> Self {
        debug_assert!(data.len() >= layout.span_bytes());
        Self { layout, data }
    }

    /// The meaningful bytes of row `y`, mutably.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.layout.stride as usize;
        let len = self.layout.row_bytes();
        &mut self.data[start..start + len]
    }

    /// Two distinct rows, mutably. Panics if `a == b`.
    pub fn row_pair_mut(&mut self, a: u32, b: u32) -> (&mut [u8], &mut [u8]) {
        assert_ne!(a, b);
        let stride = self.layout.stride as usize;
        let len = self.layout.row_bytes();
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let split = hi as usize * stride;
        let (left, right) = self.data.split_at_mut(split);
        let lo_row = &mut left[lo as usize * stride..lo as usize * stride + len];
        let hi_row = &mut right[..len];
        if a < b {
            (lo_row, hi_row)
        } else {
            (hi_row, lo_row)
        }
    }

    /// The entire backing span, mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_4x3() -> BitmapLayout {
        BitmapLayout {
            width: 4,
            height: 3,
            stride: 16,
            format: PixelFormat::Bgra32,
        }
    }

    #[test]
    fn span_accounts_for_partial_last_row() {
        let layout = BitmapLayout {
            width: 2,
            height: 3,
            stride: 100,
            format: PixelFormat::Bgr24,
        };
        // Two full strides plus one 6-byte row.
        assert_eq!(layout.span_bytes(), 206);
    }

    #[test]
    fn rows_address_by_stride() {
        let mut data = vec![0u8; 48];
        data[16] = 7; // first byte of row 1
        let view = PixelView::new(layout_4x3(), true, &data);
        assert_eq!(view.row(1)[0], 7);
        assert_eq!(view.row(0).len(), 16);
    }

    #[test]
    fn row_pair_mut_returns_requested_order() {
        let mut data = vec![0u8; 48];
        let mut view = PixelViewMut::new(layout_4x3(), &mut data);
        {
            let (r2, r0) = view.row_pair_mut(2, 0);
            r2[0] = 2;
            r0[0] = 1;
        }
        assert_eq!(data[32], 2);
        assert_eq!(data[0], 1);
    }
}

//! The job-owned bitmap pool.
//!
//! All bitmaps created during a job live here, addressed by [`BitmapId`].
//! The pool resolves window bitmaps to their owning buffer, enforces the
//! aliasing rules for read/write pairs, and routes every owned allocation
//! through the installed [`PixelAllocator`].

use std::sync::Arc;

use rasterflow_core::{BitmapId, CompositingMode, ErrorKind, FlowError, PixelFormat};

use crate::alloc::{AllocLedger, PixelAllocator, SystemAllocator, TrackedBuffer};
use crate::bitmap::{Bitmap, PixelBuf};
use crate::view::{BitmapLayout, PixelView, PixelViewMut};

/// Index-addressed bitmap storage with window resolution.
pub struct BitmapPool {
    slots: Vec<Bitmap>,
    allocator: Arc<dyn PixelAllocator>,
    ledger: Arc<AllocLedger>,
}

impl BitmapPool {
    /// A pool backed by the system allocator.
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(SystemAllocator))
    }

    /// A pool routing allocations through `allocator`.
    pub fn with_allocator(allocator: Arc<dyn PixelAllocator>) -> Self {
        Self {
            slots: Vec::new(),
            allocator,
            ledger: Arc::new(AllocLedger::new()),
        }
    }

    /// The allocation ledger shared with every owned buffer.
    pub fn ledger(&self) -> &Arc<AllocLedger> {
        &self.ledger
    }

    /// Number of bitmaps (owned and windows) in the pool.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool holds no bitmaps.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Create an owned, zero-filled bitmap.
    ///
    /// Fails with `InvalidArgument` on zero dimensions and `OutOfMemory`
    /// when the allocator declines.
    pub fn create(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        alpha_meaningful: bool,
    ) -> Result<BitmapId, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::new(
                ErrorKind::InvalidArgument,
                format!("bitmap dimensions must be nonzero, got {width}x{height}"),
            ));
        }
        let stride = width * format.bytes_per_pixel();
        let bytes = stride as usize * height as usize;
        let data = self.allocator.alloc_zeroed(bytes).ok_or_else(|| {
            FlowError::new(
                ErrorKind::OutOfMemory,
                format!("allocator declined {bytes} bytes for {width}x{height} {format}"),
            )
        })?;
        let buffer = TrackedBuffer::new(data, Arc::clone(&self.ledger));
        let id = BitmapId(self.slots.len() as u32);
        self.slots.push(Bitmap {
            width,
            height,
            stride,
            format,
            alpha_meaningful,
            matte_color: [0; 4],
            compositing: CompositingMode::ReplaceSelf,
            buf: PixelBuf::Owned(buffer),
        });
        Ok(id)
    }

    /// Create a header-only window over `[x1, x2) × [y1, y2)` of `source`.
    ///
    /// The window shares the source's buffer (chains collapse to the
    /// ultimate owner), inherits its stride, format, and compositing
    /// fields, and is never freed on its own.
    pub fn create_window(
        &mut self,
        source: BitmapId,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
    ) -> Result<BitmapId, FlowError> {
        let src = self.get(source)?;
        if x1 >= x2 || y1 >= y2 || x2 > src.width || y2 > src.height {
            return Err(FlowError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "window ({x1},{y1})-({x2},{y2}) outside {}x{} source",
                    src.width, src.height
                ),
            ));
        }
        let bpp = src.format.bytes_per_pixel();
        let local = y1 as usize * src.stride as usize + (x1 * bpp) as usize;
        let (base, offset) = match src.buf {
            PixelBuf::Owned(_) => (source, local),
            PixelBuf::Window { base, offset } => (base, offset + local),
        };
        let window = Bitmap {
            width: x2 - x1,
            height: y2 - y1,
            stride: src.stride,
            format: src.format,
            alpha_meaningful: src.alpha_meaningful,
            matte_color: src.matte_color,
            compositing: src.compositing,
            buf: PixelBuf::Window { base, offset },
        };
        let id = BitmapId(self.slots.len() as u32);
        self.slots.push(window);
        Ok(id)
    }

    /// The bitmap header behind `id`.
    pub fn get(&self, id: BitmapId) -> Result<&Bitmap, FlowError> {
        self.slots.get(id.index()).ok_or_else(|| {
            FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("bitmap {id} does not exist"),
            )
        })
    }

    /// The bitmap header behind `id`, mutably.
    pub fn get_mut(&mut self, id: BitmapId) -> Result<&mut Bitmap, FlowError> {
        self.slots.get_mut(id.index()).ok_or_else(|| {
            FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("bitmap {id} does not exist"),
            )
        })
    }

    /// Resolve `id` to `(owner slot index, byte offset, layout, alpha)`.
    fn resolve(&self, id: BitmapId) -> Result<(usize, usize, BitmapLayout, bool), FlowError> {
        let bm = self.get(id)?;
        let layout = bm.layout();
        match bm.buf {
            PixelBuf::Owned(_) => Ok((id.index(), 0, layout, bm.alpha_meaningful)),
            PixelBuf::Window { base, offset } => {
                // Window creation guarantees `base` is an owned bitmap.
                let owner = self.get(base)?;
                debug_assert!(matches!(owner.buf, PixelBuf::Owned(_)));
                Ok((base.index(), offset, layout, bm.alpha_meaningful))
            }
        }
    }

    /// Read-only pixels of `id`.
    pub fn view(&self, id: BitmapId) -> Result<PixelView<'_>, FlowError> {
        let (owner, offset, layout, alpha) = self.resolve(id)?;
        let buf = owned_buffer(&self.slots[owner])?;
        let span = layout.span_bytes();
        Ok(PixelView::new(
            layout,
            alpha,
            &buf.as_slice()[offset..offset + span],
        ))
    }

    /// Mutable pixels of `id`.
    pub fn view_mut(&mut self, id: BitmapId) -> Result<PixelViewMut<'_>, FlowError> {
        let (owner, offset, layout, _) = self.resolve(id)?;
        let buf = owned_buffer_mut(&mut self.slots[owner])?;
        let span = layout.span_bytes();
        Ok(PixelViewMut::new(
            layout,
            &mut buf.as_mut_slice()[offset..offset + span],
        ))
    }

    /// Simultaneous read view of `read` and write view of `write`.
    ///
    /// The two bitmaps must not share a buffer; aliased pairs are an
    /// internal-state error, not silently tolerated.
    pub fn read_write_pair(
        &mut self,
        read: BitmapId,
        write: BitmapId,
    ) -> Result<(PixelView<'_>, PixelViewMut<'_>), FlowError> {
        let (r_owner, r_offset, r_layout, r_alpha) = self.resolve(read)?;
        let (w_owner, w_offset, w_layout, _) = self.resolve(write)?;
        if r_owner == w_owner {
            return Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("bitmaps {read} and {write} alias the same buffer"),
            ));
        }
        let (r_bm, w_bm) = if r_owner < w_owner {
            let (left, right) = self.slots.split_at_mut(w_owner);
            (&left[r_owner], &mut right[0])
        } else {
            let (left, right) = self.slots.split_at_mut(r_owner);
            (&right[0], &mut left[w_owner])
        };
        let r_buf = owned_buffer(r_bm)?;
        let w_buf = owned_buffer_mut(w_bm)?;
        let r_span = r_layout.span_bytes();
        let w_span = w_layout.span_bytes();
        Ok((
            PixelView::new(r_layout, r_alpha, &r_buf.as_slice()[r_offset..r_offset + r_span]),
            PixelViewMut::new(
                w_layout,
                &mut w_buf.as_mut_slice()[w_offset..w_offset + w_span],
            ),
        ))
    }
}

impl Default for BitmapPool {
    fn default() -> Self {
        Self::new()
    }
}

fn owned_buffer(bm: &Bitmap) -> Result<&TrackedBuffer, FlowError> {
    match &bm.buf {
        PixelBuf::Owned(buf) => Ok(buf),
        PixelBuf::Window { .. } => Err(FlowError::new(
            ErrorKind::InvalidInternalState,
            "window bitmap used where an owner was required",
        )),
    }
}

fn owned_buffer_mut(bm: &mut Bitmap) -> Result<&mut TrackedBuffer, FlowError> {
    match &mut bm.buf {
        PixelBuf::Owned(buf) => Ok(buf),
        PixelBuf::Window { .. } => Err(FlowError::new(
            ErrorKind::InvalidInternalState,
            "window bitmap used where an owner was required",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingAllocator;
    impl PixelAllocator for FailingAllocator {
        fn alloc_zeroed(&self, _bytes: usize) -> Option<Vec<u8>> {
            None
        }
    }

    // ── creation ─────────────────────────────────────────────

    #[test]
    fn create_zeroes_and_ledgers() {
        let mut pool = BitmapPool::new();
        let id = pool.create(4, 4, PixelFormat::Bgra32, true).unwrap();
        assert_eq!(pool.ledger().live_allocations(), 1);
        assert_eq!(pool.ledger().live_bytes(), 64);
        let view = pool.view(id).unwrap();
        assert!(view.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn create_rejects_zero_dimensions() {
        let mut pool = BitmapPool::new();
        let err = pool.create(0, 4, PixelFormat::Bgr24, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn failed_allocation_is_out_of_memory() {
        let mut pool = BitmapPool::with_allocator(Arc::new(FailingAllocator));
        let err = pool.create(4, 4, PixelFormat::Bgra32, true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfMemory);
        assert!(pool.ledger().is_empty());
    }

    #[test]
    fn drop_empties_ledger() {
        let mut pool = BitmapPool::new();
        pool.create(8, 8, PixelFormat::Bgr24, false).unwrap();
        pool.create(2, 2, PixelFormat::Gray8, false).unwrap();
        let ledger = Arc::clone(pool.ledger());
        assert_eq!(ledger.live_allocations(), 2);
        drop(pool);
        assert!(ledger.is_empty());
    }

    // ── windows ──────────────────────────────────────────────

    #[test]
    fn window_shares_pixels_at_offset() {
        let mut pool = BitmapPool::new();
        let base = pool.create(4, 4, PixelFormat::Bgra32, true).unwrap();
        {
            let mut view = pool.view_mut(base).unwrap();
            view.row_mut(2)[4] = 0xAB; // pixel (1, 2), blue byte
        }
        let win = pool.create_window(base, 1, 2, 3, 4).unwrap();
        assert!(pool.get(win).unwrap().borrows_pixels());
        // No new allocation for the window.
        assert_eq!(pool.ledger().live_allocations(), 1);

        let view = pool.view(win).unwrap();
        assert_eq!(view.layout.width, 2);
        assert_eq!(view.layout.height, 2);
        assert_eq!(view.row(0)[0], 0xAB);
    }

    #[test]
    fn window_of_window_collapses_to_owner() {
        let mut pool = BitmapPool::new();
        let base = pool.create(8, 8, PixelFormat::Gray8, false).unwrap();
        {
            let mut view = pool.view_mut(base).unwrap();
            view.row_mut(3)[3] = 42;
        }
        let outer = pool.create_window(base, 1, 1, 7, 7).unwrap();
        let inner = pool.create_window(outer, 2, 2, 4, 4).unwrap();
        match pool.get(inner).unwrap().buf {
            PixelBuf::Window { base: b, offset } => {
                assert_eq!(b, base);
                assert_eq!(offset, 3 * 8 + 3);
            }
            _ => panic!("expected window"),
        }
        assert_eq!(pool.view(inner).unwrap().row(0)[0], 42);
    }

    #[test]
    fn window_rejects_out_of_bounds_rect() {
        let mut pool = BitmapPool::new();
        let base = pool.create(4, 4, PixelFormat::Bgr24, false).unwrap();
        assert!(pool.create_window(base, 0, 0, 5, 2).is_err());
        assert!(pool.create_window(base, 2, 2, 2, 3).is_err());
    }

    #[test]
    fn writes_through_window_mutate_owner() {
        let mut pool = BitmapPool::new();
        let base = pool.create(4, 4, PixelFormat::Gray8, false).unwrap();
        let win = pool.create_window(base, 1, 1, 3, 3).unwrap();
        {
            let mut view = pool.view_mut(win).unwrap();
            view.row_mut(0)[0] = 99;
        }
        let view = pool.view(base).unwrap();
        assert_eq!(view.row(1)[1], 99);
    }

    // ── pairs ────────────────────────────────────────────────

    #[test]
    fn read_write_pair_yields_disjoint_views() {
        let mut pool = BitmapPool::new();
        let a = pool.create(2, 2, PixelFormat::Gray8, false).unwrap();
        let b = pool.create(2, 2, PixelFormat::Gray8, false).unwrap();
        {
            let mut view = pool.view_mut(a).unwrap();
            view.row_mut(0)[0] = 5;
        }
        let (src, mut dst) = pool.read_write_pair(a, b).unwrap();
        dst.row_mut(0)[0] = src.row(0)[0];
        drop((src, dst));
        assert_eq!(pool.view(b).unwrap().row(0)[0], 5);
    }

    #[test]
    fn aliased_pair_is_rejected() {
        let mut pool = BitmapPool::new();
        let base = pool.create(4, 4, PixelFormat::Gray8, false).unwrap();
        let win = pool.create_window(base, 0, 0, 2, 2).unwrap();
        let err = pool.read_write_pair(win, base).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInternalState);
    }

    proptest::proptest! {
        // Any in-bounds window must see exactly the owner's pixels.
        #[test]
        fn window_pixels_match_owner(
            x1 in 0u32..8, y1 in 0u32..8, w in 1u32..8, h in 1u32..8,
        ) {
            let (x2, y2) = ((x1 + w).min(8), (y1 + h).min(8));
            proptest::prop_assume!(x1 < x2 && y1 < y2);

            let mut pool = BitmapPool::new();
            let base = pool.create(8, 8, PixelFormat::Gray8, false).unwrap();
            {
                let mut view = pool.view_mut(base).unwrap();
                for y in 0..8 {
                    for x in 0..8usize {
                        view.row_mut(y)[x] = (y * 8) as u8 + x as u8;
                    }
                }
            }
            let win = pool.create_window(base, x1, y1, x2, y2).unwrap();
            let view = pool.view(win).unwrap();
            for y in 0..(y2 - y1) {
                for x in 0..(x2 - x1) {
                    let expected = ((y1 + y) * 8 + x1 + x) as u8;
                    proptest::prop_assert_eq!(view.row(y)[x as usize], expected);
                }
            }
        }
    }
}

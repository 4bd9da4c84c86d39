//! Separable 1-D resampling onto a canvas.
//!
//! Resamples each input row to a target width and writes it to the canvas,
//! optionally transposed (rows become columns). Two transposed passes
//! compose into a full 2-D scale; one transposed pass at identity width is
//! a pure transpose. Arithmetic runs in the configured floatspace.

use rasterflow_bitmap::{PixelView, PixelViewMut};
use rasterflow_core::{
    CancelToken, CompositingMode, ErrorKind, Filter, Floatspace, FlowError, PixelFormat,
};

use crate::colorspace::{linear_to_srgb, srgb_to_linear};
use crate::weights::compute_contribs;

/// Rows between cancellation checks.
const CANCEL_CHECK_ROWS: u32 = 64;

/// Kernel-facing subset of the render-pass parameters.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Target width of each resampled row.
    pub scale_to_width: u32,
    /// Write output rows as canvas columns.
    pub transpose_on_write: bool,
    /// Horizontal placement within the canvas.
    pub canvas_x: u32,
    /// Vertical placement within the canvas.
    pub canvas_y: u32,
    /// Interpolation filter.
    pub filter: Filter,
    /// Colorspace for resampling arithmetic.
    pub floatspace: Floatspace,
    /// Percentage-based sharpening applied to resampled rows (0 = none).
    pub sharpen_percent_goal: f32,
    /// Compositing mode; only overwrite is supported.
    pub compositing: CompositingMode,
    /// Matte color (unused until matte compositing is supported).
    pub matte_color: [u8; 4],
}

/// Whether byte channel `c` of `format` holds color (vs. alpha/padding).
fn is_color_channel(format: PixelFormat, c: usize) -> bool {
    match format {
        PixelFormat::Gray8 => true,
        PixelFormat::Bgr24 => true,
        PixelFormat::Bgra32 | PixelFormat::Bgr32 => c < 3,
    }
}

/// Resample `input`'s rows to `opts.scale_to_width` pixels and write them
/// onto `canvas`.
///
/// Fails with `Unsupported` for non-overwrite compositing or a
/// input/canvas format mismatch, `InvalidArgument` when the output region
/// does not fit the canvas, and `OperationCancelled` when the token fires
/// (checked every [`CANCEL_CHECK_ROWS`] rows).
pub fn render_to_canvas_1d(
    input: &PixelView<'_>,
    canvas: &mut PixelViewMut<'_>,
    opts: &RenderOptions,
    cancel: &CancelToken,
) -> Result<(), FlowError> {
    if opts.compositing != CompositingMode::ReplaceSelf {
        return Err(FlowError::new(
            ErrorKind::Unsupported,
            "render1d supports overwrite compositing only",
        ));
    }
    let format = input.layout.format;
    if format != canvas.layout.format {
        return Err(FlowError::new(
            ErrorKind::Unsupported,
            format!(
                "render1d input format {format} does not match canvas format {}",
                canvas.layout.format
            ),
        ));
    }
    let (in_w, in_h) = (input.layout.width, input.layout.height);
    let to_w = opts.scale_to_width;
    let (need_w, need_h) = if opts.transpose_on_write {
        (opts.canvas_x + in_h, opts.canvas_y + to_w)
    } else {
        (opts.canvas_x + to_w, opts.canvas_y + in_h)
    };
    if need_w > canvas.layout.width || need_h > canvas.layout.height {
        return Err(FlowError::new(
            ErrorKind::InvalidArgument,
            format!(
                "render1d output {need_w}x{need_h} exceeds {}x{} canvas",
                canvas.layout.width, canvas.layout.height
            ),
        ));
    }

    let contribs = compute_contribs(in_w, to_w, opts.filter);
    let bpp = format.bytes_per_pixel() as usize;
    let linearize = opts.floatspace == Floatspace::Linear;

    let mut row_f = vec![0.0f32; in_w as usize * bpp];
    let mut out_f = vec![0.0f32; to_w as usize * bpp];

    for y in 0..in_h {
        if y % CANCEL_CHECK_ROWS == 0 {
            cancel.check()?;
        }

        // Decode the row into float working space.
        let row = input.row(y);
        for (i, &byte) in row.iter().enumerate() {
            row_f[i] = if linearize && is_color_channel(format, i % bpp) {
                srgb_to_linear(byte)
            } else {
                byte as f32 / 255.0
            };
        }

        // Horizontal resample.
        for (j, entry) in contribs.entries.iter().enumerate() {
            let mut acc = [0.0f32; 4];
            for (k, &w) in entry.weights.iter().enumerate() {
                let px = (entry.left as usize + k) * bpp;
                for (c, slot) in acc.iter_mut().take(bpp).enumerate() {
                    *slot += w * row_f[px + c];
                }
            }
            out_f[j * bpp..j * bpp + bpp].copy_from_slice(&acc[..bpp]);
        }

        if opts.sharpen_percent_goal > 0.0 {
            sharpen_row(&mut out_f, to_w as usize, bpp, opts.sharpen_percent_goal);
        }

        // Encode and place.
        if opts.transpose_on_write {
            let col_byte = (opts.canvas_x + y) as usize * bpp;
            for j in 0..to_w {
                let canvas_row = canvas.row_mut(opts.canvas_y + j);
                for c in 0..bpp {
                    canvas_row[col_byte + c] =
                        encode_channel(out_f[j as usize * bpp + c], linearize, format, c);
                }
            }
        } else {
            let canvas_row = canvas.row_mut(opts.canvas_y + y);
            let start = opts.canvas_x as usize * bpp;
            for j in 0..to_w as usize {
                for c in 0..bpp {
                    canvas_row[start + j * bpp + c] =
                        encode_channel(out_f[j * bpp + c], linearize, format, c);
                }
            }
        }
    }
    Ok(())
}

fn encode_channel(v: f32, linearize: bool, format: PixelFormat, c: usize) -> u8 {
    if linearize && is_color_channel(format, c) {
        linear_to_srgb(v)
    } else {
        (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
    }
}

/// 3-tap unsharp pass: `out = v + p * (v - neighbor_mean)`.
fn sharpen_row(row: &mut [f32], width: usize, bpp: usize, percent: f32) {
    if width < 3 {
        return;
    }
    let p = percent / 100.0;
    let original = row.to_vec();
    for x in 1..width - 1 {
        for c in 0..bpp {
            let left = original[(x - 1) * bpp + c];
            let mid = original[x * bpp + c];
            let right = original[(x + 1) * bpp + c];
            row[x * bpp + c] = (mid + p * (mid - (left + right) / 2.0)).clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterflow_bitmap::BitmapLayout;

    fn options(to_w: u32, transpose: bool) -> RenderOptions {
        RenderOptions {
            scale_to_width: to_w,
            transpose_on_write: transpose,
            canvas_x: 0,
            canvas_y: 0,
            filter: Filter::Triangle,
            floatspace: Floatspace::Srgb,
            sharpen_percent_goal: 0.0,
            compositing: CompositingMode::ReplaceSelf,
            matte_color: [0; 4],
        }
    }

    fn gray_layout(w: u32, h: u32) -> BitmapLayout {
        BitmapLayout {
            width: w,
            height: h,
            stride: w,
            format: PixelFormat::Gray8,
        }
    }

    #[test]
    fn identity_width_transpose_is_a_transpose() {
        // 3x2 input, distinct values; transposed output is 2x3.
        let input_data: Vec<u8> = vec![10, 20, 30, 40, 50, 60];
        let input = PixelView::new(gray_layout(3, 2), false, &input_data);
        let mut out = vec![0u8; 6];
        let mut canvas = PixelViewMut::new(gray_layout(2, 3), &mut out);

        render_to_canvas_1d(&input, &mut canvas, &options(3, true), &CancelToken::new())
            .unwrap();
        assert_eq!(out, vec![10, 40, 20, 50, 30, 60]);
    }

    #[test]
    fn uniform_input_stays_uniform_when_downscaled() {
        let input_data = vec![100u8; 64];
        let input = PixelView::new(gray_layout(64, 1), false, &input_data);
        let mut out = vec![0u8; 16];
        let mut canvas = PixelViewMut::new(gray_layout(16, 1), &mut out);

        let mut opts = options(16, false);
        opts.filter = Filter::Robidoux;
        opts.floatspace = Floatspace::Linear;
        render_to_canvas_1d(&input, &mut canvas, &opts, &CancelToken::new()).unwrap();
        assert!(out.iter().all(|&v| (99..=101).contains(&v)), "{out:?}");
    }

    #[test]
    fn downscale_averages_adjacent_pixels() {
        // Alternating 0/200 halved with a box filter → uniform 100.
        let input_data: Vec<u8> = (0..8).map(|i| if i % 2 == 0 { 0 } else { 200 }).collect();
        let input = PixelView::new(gray_layout(8, 1), false, &input_data);
        let mut out = vec![0u8; 4];
        let mut canvas = PixelViewMut::new(gray_layout(4, 1), &mut out);

        let mut opts = options(4, false);
        opts.filter = Filter::Box;
        render_to_canvas_1d(&input, &mut canvas, &opts, &CancelToken::new()).unwrap();
        assert!(out.iter().all(|&v| (99..=101).contains(&v)), "{out:?}");
    }

    #[test]
    fn bgra_alpha_resamples_without_gamma() {
        let layout = BitmapLayout {
            width: 2,
            height: 1,
            stride: 8,
            format: PixelFormat::Bgra32,
        };
        let input_data = vec![0, 0, 0, 100, 0, 0, 0, 200];
        let input = PixelView::new(layout, true, &input_data);
        let out_layout = BitmapLayout {
            width: 1,
            height: 1,
            stride: 4,
            format: PixelFormat::Bgra32,
        };
        let mut out = vec![0u8; 4];
        let mut canvas = PixelViewMut::new(out_layout, &mut out);

        let mut opts = options(1, false);
        opts.filter = Filter::Box;
        opts.floatspace = Floatspace::Linear;
        render_to_canvas_1d(&input, &mut canvas, &opts, &CancelToken::new()).unwrap();
        // Alpha averages arithmetically: (100 + 200) / 2.
        assert!((149..=151).contains(&out[3]), "alpha was {}", out[3]);
    }

    #[test]
    fn canvas_offset_places_output() {
        let input_data = vec![255u8; 2];
        let input = PixelView::new(gray_layout(2, 1), false, &input_data);
        let mut out = vec![0u8; 16];
        let mut canvas = PixelViewMut::new(gray_layout(4, 4), &mut out);

        let mut opts = options(2, false);
        opts.canvas_x = 1;
        opts.canvas_y = 2;
        render_to_canvas_1d(&input, &mut canvas, &opts, &CancelToken::new()).unwrap();
        assert_eq!(out[2 * 4], 0);
        assert_eq!(out[2 * 4 + 1], 255);
        assert_eq!(out[2 * 4 + 2], 255);
        assert_eq!(out[2 * 4 + 3], 0);
    }

    #[test]
    fn rejects_oversized_output_region() {
        let input_data = vec![0u8; 4];
        let input = PixelView::new(gray_layout(4, 1), false, &input_data);
        let mut out = vec![0u8; 4];
        let mut canvas = PixelViewMut::new(gray_layout(2, 2), &mut out);

        let err = render_to_canvas_1d(&input, &mut canvas, &options(4, false), &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn rejects_blend_compositing() {
        let input_data = vec![0u8; 2];
        let input = PixelView::new(gray_layout(2, 1), false, &input_data);
        let mut out = vec![0u8; 2];
        let mut canvas = PixelViewMut::new(gray_layout(2, 1), &mut out);

        let mut opts = options(2, false);
        opts.compositing = CompositingMode::BlendWithSelf;
        let err = render_to_canvas_1d(&input, &mut canvas, &opts, &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unsupported);
    }

    #[test]
    fn cancelled_token_aborts_before_work() {
        let input_data = vec![0u8; 2];
        let input = PixelView::new(gray_layout(2, 1), false, &input_data);
        let mut out = vec![0u8; 2];
        let mut canvas = PixelViewMut::new(gray_layout(2, 1), &mut out);

        let token = CancelToken::new();
        token.request();
        let err = render_to_canvas_1d(&input, &mut canvas, &options(2, false), &token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OperationCancelled);
    }

    #[test]
    fn sharpen_increases_local_contrast() {
        let input_data = vec![50, 50, 200, 50, 50];
        let input = PixelView::new(gray_layout(5, 1), false, &input_data);

        let mut plain = vec![0u8; 5];
        let mut sharp = vec![0u8; 5];
        let base = options(5, false);
        render_to_canvas_1d(
            &input,
            &mut PixelViewMut::new(gray_layout(5, 1), &mut plain),
            &base,
            &CancelToken::new(),
        )
        .unwrap();
        let mut opts = base;
        opts.sharpen_percent_goal = 50.0;
        render_to_canvas_1d(
            &input,
            &mut PixelViewMut::new(gray_layout(5, 1), &mut sharp),
            &opts,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(sharp[2] >= plain[2]);
        assert!(sharp[1] <= plain[1]);
    }
}

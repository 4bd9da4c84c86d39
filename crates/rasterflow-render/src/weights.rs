//! Resampling weight computation.
//!
//! For each output pixel of a 1-D pass, precompute the contiguous span of
//! input pixels that contribute and their normalized weights. The cubic
//! filter family shares one `(B, C)` spline evaluator; box and triangle
//! get direct formulas.

use rasterflow_core::Filter;

/// Contribution of input pixels to one output pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelWeights {
    /// Index of the first contributing input pixel.
    pub left: u32,
    /// One weight per input pixel starting at `left`; sums to 1.
    pub weights: Vec<f32>,
}

/// Weights for every output pixel of a resampling pass.
#[derive(Clone, Debug)]
pub struct LineContribs {
    /// Per-output-pixel contributions, indexed by output x.
    pub entries: Vec<PixelWeights>,
}

/// Mitchell-Netravali generalized cubic.
fn cubic_bc(b: f32, c: f32, x: f32) -> f32 {
    let x = x.abs();
    if x < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * x * x * x
            + (-18.0 + 12.0 * b + 6.0 * c) * x * x
            + (6.0 - 2.0 * b))
            / 6.0
    } else if x < 2.0 {
        ((-b - 6.0 * c) * x * x * x
            + (6.0 * b + 30.0 * c) * x * x
            + (-12.0 * b - 48.0 * c) * x
            + (8.0 * b + 24.0 * c))
            / 6.0
    } else {
        0.0
    }
}

fn filter_value(filter: Filter, x: f32) -> f32 {
    match filter {
        Filter::Box => {
            if x.abs() <= 0.5 {
                1.0
            } else {
                0.0
            }
        }
        Filter::Triangle => {
            let x = x.abs();
            if x < 1.0 {
                1.0 - x
            } else {
                0.0
            }
        }
        Filter::Hermite => cubic_bc(0.0, 0.0, x),
        Filter::CatmullRom => cubic_bc(0.0, 0.5, x),
        Filter::Mitchell => cubic_bc(1.0 / 3.0, 1.0 / 3.0, x),
        Filter::Robidoux => cubic_bc(0.378_82, 0.310_89, x),
        Filter::RobidouxSharp => cubic_bc(0.262_0, 0.369_0, x),
    }
}

fn filter_radius(filter: Filter) -> f32 {
    match filter {
        Filter::Box => 0.5,
        Filter::Triangle => 1.0,
        _ => 2.0,
    }
}

/// Compute contributions for resampling a line of `from_width` pixels to
/// `to_width` pixels with `filter`.
///
/// When downscaling, the filter support widens by the inverse scale so
/// every input pixel contributes somewhere (area-style averaging).
pub fn compute_contribs(from_width: u32, to_width: u32, filter: Filter) -> LineContribs {
    debug_assert!(from_width > 0 && to_width > 0);
    let scale = to_width as f64 / from_width as f64;
    let downscale = scale.min(1.0) as f32;
    let radius = filter_radius(filter) / downscale;

    let mut entries = Vec::with_capacity(to_width as usize);
    for out_x in 0..to_width {
        let center = (out_x as f64 + 0.5) / scale;
        let left = ((center - radius as f64).floor().max(0.0)) as u32;
        let right = ((center + radius as f64).ceil() as i64).min(from_width as i64) as u32;
        let right = right.max(left + 1);

        let mut weights = Vec::with_capacity((right - left) as usize);
        let mut total = 0.0f32;
        for in_x in left..right {
            let distance = (in_x as f64 + 0.5 - center) as f32 * downscale;
            let w = filter_value(filter, distance);
            weights.push(w);
            total += w;
        }
        if total.abs() < f32::EPSILON {
            // Degenerate window (all weights at the filter's zero
            // crossings); fall back to the nearest pixel.
            let nearest = (center as u32).min(from_width - 1);
            entries.push(PixelWeights {
                left: nearest,
                weights: vec![1.0],
            });
            continue;
        }
        for w in &mut weights {
            *w /= total;
        }
        entries.push(PixelWeights { left, weights });
    }
    LineContribs { entries }
}

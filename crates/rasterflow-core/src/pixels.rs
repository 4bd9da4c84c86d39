//! Pixel, compositing, filter, and working-colorspace vocabulary.

use std::fmt;

/// Uncompressed pixel layouts the engine understands.
///
/// Discriminants are ABI-stable and match the wire encoding used by the
/// JSON layer and the raw bitmap codec.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit gray channel.
    Gray8 = 1,
    /// 3 bytes per pixel, blue-green-red order.
    Bgr24 = 3,
    /// 4 bytes per pixel, blue-green-red-alpha order.
    Bgra32 = 4,
    /// 4 bytes per pixel with an ignored fourth byte.
    Bgr32 = 70,
}

impl PixelFormat {
    /// Storage bytes per pixel.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Gray8 => 1,
            Self::Bgr24 => 3,
            Self::Bgra32 | Self::Bgr32 => 4,
        }
    }

    /// Meaningful color/alpha channels.
    pub fn channels(self) -> u32 {
        match self {
            Self::Gray8 => 1,
            Self::Bgr24 | Self::Bgr32 => 3,
            Self::Bgra32 => 4,
        }
    }

    /// Decode a wire discriminant.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Gray8),
            3 => Some(Self::Bgr24),
            4 => Some(Self::Bgra32),
            70 => Some(Self::Bgr32),
            _ => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gray8 => "gray8",
            Self::Bgr24 => "bgr24",
            Self::Bgra32 => "bgra32",
            Self::Bgr32 => "bgr32",
        };
        write!(f, "{name}")
    }
}

/// How a bitmap's pixels combine with a compositing destination.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompositingMode {
    /// Overwrite destination pixels.
    #[default]
    ReplaceSelf = 0,
    /// Alpha-blend over the destination.
    BlendWithSelf = 1,
    /// Blend against the bitmap's matte color.
    BlendWithMatte = 2,
}

/// Interpolation filter for 1-D resampling.
///
/// The cubic family members differ only in their `(B, C)` spline
/// parameters; the render crate owns that table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Nearest-area box averaging.
    Box,
    /// Linear tent filter.
    Triangle,
    /// Hermite cubic (B=0, C=0).
    Hermite,
    /// Catmull-Rom cubic (B=0, C=0.5).
    CatmullRom,
    /// Mitchell-Netravali cubic (B=C=1/3).
    Mitchell,
    /// Robidoux cubic, the default; a near-optimal EWA-derived spline.
    #[default]
    Robidoux,
    /// Sharper Robidoux variant.
    RobidouxSharp,
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Box => "box",
            Self::Triangle => "triangle",
            Self::Hermite => "hermite",
            Self::CatmullRom => "catmullrom",
            Self::Mitchell => "mitchell",
            Self::Robidoux => "robidoux",
            Self::RobidouxSharp => "robidoux_sharp",
        };
        write!(f, "{name}")
    }
}

/// Colorspace in which resampling arithmetic runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Floatspace {
    /// Operate directly on stored sRGB values. Fast, slightly wrong.
    Srgb,
    /// Convert to linear light, resample, convert back. The default.
    #[default]
    Linear,
}

impl fmt::Display for Floatspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Srgb => write!(f, "sRGB"),
            Self::Linear => write!(f, "linear"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_pixel_per_format() {
        assert_eq!(PixelFormat::Gray8.bytes_per_pixel(), 1);
        assert_eq!(PixelFormat::Bgr24.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Bgra32.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Bgr32.bytes_per_pixel(), 4);
    }

    #[test]
    fn format_codes_round_trip() {
        for fmt in [
            PixelFormat::Gray8,
            PixelFormat::Bgr24,
            PixelFormat::Bgra32,
            PixelFormat::Bgr32,
        ] {
            assert_eq!(PixelFormat::from_code(fmt as u8), Some(fmt));
        }
        assert_eq!(PixelFormat::from_code(0), None);
        assert_eq!(PixelFormat::from_code(2), None);
    }

    #[test]
    fn defaults_match_engine_conventions() {
        assert_eq!(Filter::default(), Filter::Robidoux);
        assert_eq!(Floatspace::default(), Floatspace::Linear);
        assert_eq!(CompositingMode::default(), CompositingMode::ReplaceSelf);
    }
}

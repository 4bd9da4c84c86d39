//! Codec identity vocabulary.

use std::fmt;

/// Identifies an image container format the codec registry can serve.
///
/// Concrete PNG/JPEG/GIF implementations are installed by the embedder;
/// the raw bitmap format ships built-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecKind {
    /// Engine-native uncompressed bitmap container.
    RawBitmap,
    /// Portable Network Graphics.
    Png,
    /// JPEG/JFIF.
    Jpeg,
    /// GIF (first frame only).
    Gif,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RawBitmap => "raw",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
        };
        write!(f, "{name}")
    }
}

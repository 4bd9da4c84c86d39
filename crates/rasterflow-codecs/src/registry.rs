//! Codec selection by container kind or byte signature.

use indexmap::IndexMap;

use rasterflow_core::{CodecKind, ErrorKind, FlowError, IoId};

use crate::codec::{Decoder, Encoder};
use crate::raw::{RawDecoder, RawEncoder, RAW_MAGIC};

/// Creates a decoder bound to an input buffer.
pub type DecoderFactory = fn(IoId) -> Box<dyn Decoder>;
/// Creates an encoder bound to an output buffer.
pub type EncoderFactory = fn(IoId) -> Box<dyn Encoder>;

/// Registered codec factories, keyed by container kind.
///
/// The raw bitmap codec is always present; PNG/JPEG/GIF slots exist in the
/// detection table but produce `Unsupported` until the embedder registers
/// implementations.
pub struct CodecRegistry {
    decoders: IndexMap<CodecKind, DecoderFactory>,
    encoders: IndexMap<CodecKind, EncoderFactory>,
}

impl CodecRegistry {
    /// A registry with the built-in raw bitmap codec installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            decoders: IndexMap::new(),
            encoders: IndexMap::new(),
        };
        registry.register_decoder(CodecKind::RawBitmap, |io_id| {
            Box::new(RawDecoder::new(io_id))
        });
        registry.register_encoder(CodecKind::RawBitmap, |io_id| {
            Box::new(RawEncoder::new(io_id))
        });
        registry
    }

    /// Install (or replace) a decoder factory for `kind`.
    pub fn register_decoder(&mut self, kind: CodecKind, factory: DecoderFactory) {
        self.decoders.insert(kind, factory);
    }

    /// Install (or replace) an encoder factory for `kind`.
    pub fn register_encoder(&mut self, kind: CodecKind, factory: EncoderFactory) {
        self.encoders.insert(kind, factory);
    }

    /// Identify a container by its leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<CodecKind> {
        if bytes.starts_with(&RAW_MAGIC) {
            Some(CodecKind::RawBitmap)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(CodecKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(CodecKind::Jpeg)
        } else if bytes.starts_with(b"GIF8") {
            Some(CodecKind::Gif)
        } else {
            None
        }
    }

    /// Instantiate a decoder for `kind` reading `io_id`.
    pub fn create_decoder(
        &self,
        kind: CodecKind,
        io_id: IoId,
    ) -> Result<Box<dyn Decoder>, FlowError> {
        match self.decoders.get(&kind) {
            Some(factory) => Ok(factory(io_id)),
            None => Err(FlowError::new(
                ErrorKind::Unsupported,
                format!("no {kind} decoder is registered"),
            )),
        }
    }

    /// Instantiate an encoder for `kind` writing `io_id`.
    pub fn create_encoder(
        &self,
        kind: CodecKind,
        io_id: IoId,
    ) -> Result<Box<dyn Encoder>, FlowError> {
        match self.encoders.get(&kind) {
            Some(factory) => Ok(factory(io_id)),
            None => Err(FlowError::new(
                ErrorKind::Unsupported,
                format!("no {kind} encoder is registered"),
            )),
        }
    }

    /// Detect the container in `bytes` and instantiate its decoder.
    ///
    /// An unrecognizable signature is `ImageMalformed`; a recognized but
    /// unregistered codec is `Unsupported`.
    pub fn decoder_for_bytes(
        &self,
        bytes: &[u8],
        io_id: IoId,
    ) -> Result<Box<dyn Decoder>, FlowError> {
        let kind = Self::detect(bytes).ok_or_else(|| {
            FlowError::new(
                ErrorKind::ImageMalformed,
                format!("io_id {io_id} does not start with a known image signature"),
            )
        })?;
        self.create_decoder(kind, io_id)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

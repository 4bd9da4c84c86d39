//! Lazily-bound codec instance slots.
//!
//! Decoder and encoder nodes carry a `CodecSlotId` in their parameters
//! once bound; the instances themselves live here, owned by the job
//! context, so parse state survives between the dimension pass (which
//! needs frame info) and execution (which reads pixels).

use rasterflow_core::{CodecSlotId, ErrorKind, FlowError};

use crate::codec::{Decoder, Encoder};

/// One bound codec instance.
pub enum CodecInstance {
    /// A decoder bound to an input buffer.
    Decoder(Box<dyn Decoder>),
    /// An encoder bound to an output buffer.
    Encoder(Box<dyn Encoder>),
}

/// Append-only table of bound codec instances.
#[derive(Default)]
pub struct CodecSlots {
    slots: Vec<CodecInstance>,
}

impl CodecSlots {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decoder, returning its slot.
    pub fn add_decoder(&mut self, decoder: Box<dyn Decoder>) -> CodecSlotId {
        let id = CodecSlotId(self.slots.len() as u32);
        self.slots.push(CodecInstance::Decoder(decoder));
        id
    }

    /// Store an encoder, returning its slot.
    pub fn add_encoder(&mut self, encoder: Box<dyn Encoder>) -> CodecSlotId {
        let id = CodecSlotId(self.slots.len() as u32);
        self.slots.push(CodecInstance::Encoder(encoder));
        id
    }

    /// The decoder in `slot`; wrong slot contents are an internal error.
    pub fn decoder_mut(&mut self, slot: CodecSlotId) -> Result<&mut dyn Decoder, FlowError> {
        match self.slots.get_mut(slot.index()) {
            Some(CodecInstance::Decoder(d)) => Ok(d.as_mut()),
            Some(CodecInstance::Encoder(_)) => Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("codec slot {slot} holds an encoder, expected a decoder"),
            )),
            None => Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("codec slot {slot} does not exist"),
            )),
        }
    }

    /// The encoder in `slot`.
    pub fn encoder_mut(&mut self, slot: CodecSlotId) -> Result<&mut dyn Encoder, FlowError> {
        match self.slots.get_mut(slot.index()) {
            Some(CodecInstance::Encoder(e)) => Ok(e.as_mut()),
            Some(CodecInstance::Decoder(_)) => Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("codec slot {slot} holds a decoder, expected an encoder"),
            )),
            None => Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("codec slot {slot} does not exist"),
            )),
        }
    }

    /// Number of bound instances.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no instances are bound.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

//! The per-context I/O buffer registry.

use indexmap::IndexMap;

use rasterflow_core::{ErrorKind, FlowError, IoId};

/// Direction of an I/O resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoDirection {
    /// Bytes flowing into the engine (decode sources).
    In,
    /// Bytes flowing out (encode destinations).
    Out,
}

/// Bytes backing an input buffer.
///
/// `Owned` copies were taken at registration (`OutlivesFunctionCall`
/// lifetime); `Static` borrows caller memory pledged to outlive the
/// context (`OutlivesContext`).
#[derive(Debug)]
pub enum InputBytes {
    /// Context-owned copy.
    Owned(Vec<u8>),
    /// Borrowed caller memory.
    Static(&'static [u8]),
}

impl InputBytes {
    /// The byte contents.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(v) => v,
            Self::Static(s) => s,
        }
    }
}

#[derive(Debug)]
enum IoBacking {
    Input(InputBytes),
    Output(Vec<u8>),
}

/// Insertion-ordered registry of a context's I/O buffers.
#[derive(Debug, Default)]
pub struct IoRegistry {
    entries: IndexMap<IoId, IoBacking>,
}

impl IoRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input buffer. `io_id` must be unused.
    pub fn add_input_buffer(&mut self, io_id: IoId, bytes: InputBytes) -> Result<(), FlowError> {
        self.insert(io_id, IoBacking::Input(bytes))
    }

    /// Register a growable, context-owned output buffer.
    pub fn add_output_buffer(&mut self, io_id: IoId) -> Result<(), FlowError> {
        self.insert(io_id, IoBacking::Output(Vec::new()))
    }

    fn insert(&mut self, io_id: IoId, backing: IoBacking) -> Result<(), FlowError> {
        if self.entries.contains_key(&io_id) {
            return Err(FlowError::new(
                ErrorKind::InvalidArgument,
                format!("io_id {io_id} is already registered"),
            ));
        }
        self.entries.insert(io_id, backing);
        Ok(())
    }

    /// Direction of a registered buffer.
    pub fn direction(&self, io_id: IoId) -> Option<IoDirection> {
        self.entries.get(&io_id).map(|b| match b {
            IoBacking::Input(_) => IoDirection::In,
            IoBacking::Output(_) => IoDirection::Out,
        })
    }

    /// Bytes of an input buffer.
    pub fn input_bytes(&self, io_id: IoId) -> Result<&[u8], FlowError> {
        match self.entries.get(&io_id) {
            Some(IoBacking::Input(bytes)) => Ok(bytes.as_slice()),
            Some(IoBacking::Output(_)) => Err(FlowError::new(
                ErrorKind::InvalidArgument,
                format!("io_id {io_id} is an output buffer, not an input"),
            )),
            None => Err(FlowError::new(
                ErrorKind::PrimaryResourceNotFound,
                format!("no buffer registered as io_id {io_id}"),
            )),
        }
    }

    /// Read-only view of an output buffer's current contents.
    pub fn output_bytes(&self, io_id: IoId) -> Result<&[u8], FlowError> {
        match self.entries.get(&io_id) {
            Some(IoBacking::Output(bytes)) => Ok(bytes),
            Some(IoBacking::Input(_)) => Err(FlowError::new(
                ErrorKind::InvalidArgument,
                format!("io_id {io_id} is an input buffer, not an output"),
            )),
            None => Err(FlowError::new(
                ErrorKind::PrimaryResourceNotFound,
                format!("no buffer registered as io_id {io_id}"),
            )),
        }
    }

    /// Mutable access to an output buffer, for encoders.
    pub fn output_mut(&mut self, io_id: IoId) -> Result<&mut Vec<u8>, FlowError> {
        match self.entries.get_mut(&io_id) {
            Some(IoBacking::Output(bytes)) => Ok(bytes),
            Some(IoBacking::Input(_)) => Err(FlowError::new(
                ErrorKind::InvalidArgument,
                format!("io_id {io_id} is an input buffer, not an output"),
            )),
            None => Err(FlowError::new(
                ErrorKind::PrimaryResourceNotFound,
                format!("no buffer registered as io_id {io_id}"),
            )),
        }
    }

    /// Registered IDs, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = IoId> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_io_id_is_rejected() {
        let mut io = IoRegistry::new();
        io.add_input_buffer(IoId(0), InputBytes::Owned(vec![1]))
            .unwrap();
        let err = io.add_output_buffer(IoId(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn input_and_output_roles_are_enforced() {
        let mut io = IoRegistry::new();
        io.add_input_buffer(IoId(0), InputBytes::Owned(vec![1, 2]))
            .unwrap();
        io.add_output_buffer(IoId(1)).unwrap();

        assert_eq!(io.input_bytes(IoId(0)).unwrap(), &[1, 2]);
        assert_eq!(io.direction(IoId(0)), Some(IoDirection::In));
        assert_eq!(io.direction(IoId(1)), Some(IoDirection::Out));
        assert!(io.input_bytes(IoId(1)).is_err());
        assert!(io.output_bytes(IoId(0)).is_err());
    }

    #[test]
    fn missing_buffer_is_resource_not_found() {
        let io = IoRegistry::new();
        assert_eq!(
            io.input_bytes(IoId(9)).unwrap_err().kind,
            ErrorKind::PrimaryResourceNotFound
        );
    }

    #[test]
    fn output_buffers_grow_through_output_mut() {
        let mut io = IoRegistry::new();
        io.add_output_buffer(IoId(2)).unwrap();
        io.output_mut(IoId(2)).unwrap().extend_from_slice(b"abc");
        assert_eq!(io.output_bytes(IoId(2)).unwrap(), b"abc");
    }

    #[test]
    fn static_input_bytes_are_borrowed() {
        static BYTES: [u8; 3] = [7, 8, 9];
        let mut io = IoRegistry::new();
        io.add_input_buffer(IoId(0), InputBytes::Static(&BYTES))
            .unwrap();
        assert_eq!(io.input_bytes(IoId(0)).unwrap(), &[7, 8, 9]);
    }
}

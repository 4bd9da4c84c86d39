//! Error taxonomy and the per-context error state machine.
//!
//! Errors are raised once and bubbled: a failing operation constructs a
//! [`FlowError`], callers append [`CallFrame`]s on the way up, and the
//! public boundary records the result in the context's [`ErrorState`].
//! Exit-code and HTTP-code mappings are fixed tables.

use std::error::Error;
use std::fmt;
use std::panic::Location;

/// Classification of every failure the engine can report.
///
/// Values are ABI-stable; the FFI returns them as `i32`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The pluggable allocator refused an allocation.
    OutOfMemory = 10,
    /// Reading or writing an I/O resource failed.
    IoError = 20,
    /// A graph/state invariant was violated; a programmer error.
    InvalidInternalState = 30,
    /// Unexpected failure (panic class). Non-recoverable.
    InternalError = 31,
    /// The operation or format is not supported.
    Unsupported = 40,
    /// A caller-supplied value is out of range or malformed.
    InvalidArgument = 50,
    /// A required argument was null/absent.
    NullArgument = 51,
    /// A node's parameters are invalid for its input dimensions.
    NodeArgInvalid = 52,
    /// The operation graph is structurally invalid.
    InvalidGraph = 53,
    /// Placeholder nodes remained after resource binding.
    GraphCouldNotBeCompleted = 54,
    /// The flatten/execute fixpoint loop hit its pass limit.
    MaximumGraphPassesExceeded = 55,
    /// The engine could not find a way to satisfy the request.
    NoSolution = 56,
    /// An input image could not be decoded.
    ImageMalformed = 60,
    /// The primary resource (e.g. the main input image) is missing.
    PrimaryResourceNotFound = 70,
    /// A secondary resource (e.g. a watermark) is missing.
    SecondaryResourceNotFound = 71,
    /// An upstream dependency failed.
    UpstreamError = 72,
    /// An upstream dependency timed out.
    UpstreamTimeout = 73,
    /// Authentication is required.
    AuthorizationRequired = 80,
    /// A license is required for this operation.
    LicenseError = 81,
    /// The action is forbidden for this caller.
    ActionForbidden = 82,
    /// An error was raised while another error was already set.
    ErrorReportingInconsistency = 90,
    /// The context was cancelled. Sticky and non-recoverable.
    OperationCancelled = 100,
}

impl ErrorKind {
    /// Process exit code for command-line front ends (sysexits-style).
    pub fn exit_code(self) -> i32 {
        match self {
            Self::InvalidArgument | Self::NullArgument | Self::NodeArgInvalid => 64,
            Self::InvalidGraph
            | Self::GraphCouldNotBeCompleted
            | Self::ImageMalformed
            | Self::Unsupported => 65,
            Self::PrimaryResourceNotFound => 66,
            Self::UpstreamError | Self::UpstreamTimeout => 69,
            Self::InvalidInternalState
            | Self::InternalError
            | Self::NoSolution
            | Self::MaximumGraphPassesExceeded
            | Self::ErrorReportingInconsistency => 70,
            Self::OutOfMemory => 71,
            Self::IoError | Self::SecondaryResourceNotFound => 74,
            Self::AuthorizationRequired | Self::ActionForbidden => 77,
            Self::LicenseError => 402,
            Self::OperationCancelled => 130,
        }
    }

    /// HTTP status code for service front ends.
    pub fn http_code(self) -> i32 {
        match self {
            Self::InvalidArgument
            | Self::NullArgument
            | Self::NodeArgInvalid
            | Self::InvalidGraph
            | Self::GraphCouldNotBeCompleted
            | Self::ImageMalformed
            | Self::Unsupported => 400,
            Self::AuthorizationRequired => 401,
            Self::LicenseError => 402,
            Self::ActionForbidden => 403,
            Self::PrimaryResourceNotFound => 404,
            Self::OperationCancelled => 499,
            Self::InvalidInternalState
            | Self::InternalError
            | Self::NoSolution
            | Self::MaximumGraphPassesExceeded
            | Self::ErrorReportingInconsistency
            | Self::IoError
            | Self::SecondaryResourceNotFound => 500,
            Self::UpstreamError => 502,
            Self::OutOfMemory => 503,
            Self::UpstreamTimeout => 504,
        }
    }

    /// Whether a client may clear this error and keep using the context.
    ///
    /// Cancellation, allocator exhaustion, and the panic/inconsistency
    /// class leave the context in an unknown state and are sticky.
    pub fn recoverable(self) -> bool {
        !matches!(
            self,
            Self::OperationCancelled
                | Self::OutOfMemory
                | Self::InternalError
                | Self::InvalidInternalState
                | Self::ErrorReportingInconsistency
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One frame of the error callstack: where a failure was raised or
/// re-observed while bubbling up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallFrame {
    /// Source file of the frame.
    pub file: &'static str,
    /// Line within the file.
    pub line: u32,
}

impl CallFrame {
    /// Capture the caller's location.
    #[track_caller]
    pub fn here() -> Self {
        let loc = Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// An error in flight: kind, human message, and accumulated callstack.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowError {
    /// Classification used for exit/HTTP mapping and recoverability.
    pub kind: ErrorKind,
    /// Human-readable description of the failure.
    pub message: String,
    /// Frames accumulated while the error bubbled up, innermost first.
    pub frames: Vec<CallFrame>,
}

impl FlowError {
    /// Construct an error, capturing the caller's location as the first
    /// callstack frame.
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            frames: vec![CallFrame::here()],
        }
    }

    /// Append the caller's location to the callstack and return the error.
    ///
    /// Use at phase boundaries when propagating with `?` would lose the
    /// unwinding trail: `op().map_err(FlowError::trace)?`.
    #[track_caller]
    pub fn trace(mut self) -> Self {
        self.frames.push(CallFrame::here());
        self
    }

    /// Render the error with its full callstack into `out`.
    pub fn write_with_stacktrace(&self, out: &mut String) {
        use fmt::Write;
        let _ = write!(out, "{} ({}): {}", self.kind, self.kind as i32, self.message);
        for frame in &self.frames {
            let _ = write!(out, "\nat {frame}");
        }
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for FlowError {}

/// The single error slot owned by a job context.
///
/// Holds at most one error. A second non-override raise while the slot is
/// occupied either coalesces (recoverable originals keep precedence) or
/// degrades the state to [`ErrorKind::ErrorReportingInconsistency`]
/// (non-recoverable originals must not be silently replaced).
#[derive(Debug, Default)]
pub struct ErrorState {
    slot: Option<FlowError>,
}

impl ErrorState {
    /// An empty error state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an error is currently set.
    pub fn has_error(&self) -> bool {
        self.slot.is_some()
    }

    /// The current error, if any.
    pub fn current(&self) -> Option<&FlowError> {
        self.slot.as_ref()
    }

    /// Record an error.
    ///
    /// Empty slot: stores `error`. Occupied by a recoverable error: the
    /// original wins and `error`'s message is appended to its callstack
    /// trail. Occupied by a non-recoverable error: the state becomes
    /// `ErrorReportingInconsistency` naming both errors.
    pub fn raise(&mut self, error: FlowError) {
        match &mut self.slot {
            None => self.slot = Some(error),
            Some(existing) if existing.kind.recoverable() => {
                existing
                    .message
                    .push_str(&format!("; also: {}: {}", error.kind, error.message));
                existing.frames.extend(error.frames);
            }
            Some(existing) => {
                let message = format!(
                    "raised {}: {} while {}: {} was set",
                    error.kind, error.message, existing.kind, existing.message
                );
                let mut frames = std::mem::take(&mut existing.frames);
                frames.extend(error.frames);
                self.slot = Some(FlowError {
                    kind: ErrorKind::ErrorReportingInconsistency,
                    message,
                    frames,
                });
            }
        }
    }

    /// Record an error, replacing whatever is set, except a cancellation,
    /// which stays sticky.
    pub fn raise_override(&mut self, error: FlowError) {
        if matches!(
            self.slot.as_ref().map(|e| e.kind),
            Some(ErrorKind::OperationCancelled)
        ) {
            return;
        }
        self.slot = Some(error);
    }

    /// Append a frame to the current error's callstack. No-op when no
    /// error is set.
    pub fn add_frame(&mut self, frame: CallFrame) {
        if let Some(e) = &mut self.slot {
            e.frames.push(frame);
        }
    }

    /// Clear the error iff it is recoverable. Returns whether the slot is
    /// now empty.
    pub fn try_clear(&mut self) -> bool {
        match &self.slot {
            None => true,
            Some(e) if e.kind.recoverable() => {
                self.slot = None;
                true
            }
            Some(_) => false,
        }
    }
}

//! Lock-free cancellation flag shared across a job context.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ErrorKind, FlowError};

/// A single sticky cancellation bit.
///
/// [`request`](CancelToken::request) may be called from any thread without
/// taking the context's operation lock. Long-running operations observe the
/// flag on a bounded cadence (the executor checks between nodes, pixel
/// kernels check per scanline block) and fail with
/// [`ErrorKind::OperationCancelled`].
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Idempotent; never blocks.
    pub fn request(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail with `OperationCancelled` if the flag is set.
    #[track_caller]
    pub fn check(&self) -> Result<(), FlowError> {
        if self.is_cancelled() {
            Err(FlowError::new(
                ErrorKind::OperationCancelled,
                "cancellation requested",
            ))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn request_is_sticky_and_idempotent() {
        let token = CancelToken::new();
        token.request();
        token.request();
        assert!(token.is_cancelled());
        assert_eq!(
            token.check().unwrap_err().kind,
            ErrorKind::OperationCancelled
        );
    }

    #[test]
    fn visible_across_threads() {
        let token = Arc::new(CancelToken::new());
        let remote = Arc::clone(&token);
        std::thread::spawn(move || remote.request())
            .join()
            .unwrap();
        assert!(token.is_cancelled());
    }
}

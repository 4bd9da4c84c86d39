//! Pluggable pixel allocation and the live-allocation ledger.
//!
//! Host embedders can enforce memory quotas by installing their own
//! [`PixelAllocator`]; every pixel buffer in the engine is requested
//! through it. The [`AllocLedger`] counts live buffers and bytes so a
//! context can verify at teardown that nothing leaked.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of zeroed pixel buffers.
///
/// Returning `None` signals allocation failure; the engine converts that
/// to `OutOfMemory` and unwinds the job.
pub trait PixelAllocator: Send + Sync {
    /// Allocate a zero-filled buffer of `bytes` bytes, or `None`.
    fn alloc_zeroed(&self, bytes: usize) -> Option<Vec<u8>>;
}

/// Default allocator backed by the global heap.
#[derive(Debug, Default)]
pub struct SystemAllocator;

impl PixelAllocator for SystemAllocator {
    fn alloc_zeroed(&self, bytes: usize) -> Option<Vec<u8>> {
        Some(vec![0u8; bytes])
    }
}

/// Counters for live tracked allocations.
///
/// Shared (via `Arc`) between the pool and every [`TrackedBuffer`]; drop
/// of a buffer decrements the counters, so an empty ledger at context
/// teardown proves the allocation discipline held.
#[derive(Debug, Default)]
pub struct AllocLedger {
    live: AtomicUsize,
    bytes: AtomicUsize,
}

impl AllocLedger {
    /// A fresh ledger with zero live allocations.
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, bytes: usize) {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn unregister(&self, bytes: usize) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        self.bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Number of live tracked buffers.
    pub fn live_allocations(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Total bytes held by live tracked buffers.
    pub fn live_bytes(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Whether every tracked buffer has been dropped.
    pub fn is_empty(&self) -> bool {
        self.live_allocations() == 0
    }
}

/// A pixel buffer whose lifetime is recorded in an [`AllocLedger`].
pub struct TrackedBuffer {
    data: Vec<u8>,
    ledger: Arc<AllocLedger>,
}

impl TrackedBuffer {
    /// Wrap an allocated buffer, registering it with the ledger.
    pub fn new(data: Vec<u8>, ledger: Arc<AllocLedger>) -> Self {
        ledger.register(data.len());
        Self { data, ledger }
    }

    /// The buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The buffer contents, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is zero-length.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for TrackedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}

impl Drop for TrackedBuffer {
    fn drop(&mut self) {
        self.ledger.unregister(self.data.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_returns_zeroed() {
        let buf = SystemAllocator.alloc_zeroed(64).unwrap();
        assert_eq!(buf.len(), 64);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn ledger_counts_registrations_and_drops() {
        let ledger = Arc::new(AllocLedger::new());
        assert!(ledger.is_empty());

        let a = TrackedBuffer::new(vec![0; 100], Arc::clone(&ledger));
        let b = TrackedBuffer::new(vec![0; 50], Arc::clone(&ledger));
        assert_eq!(ledger.live_allocations(), 2);
        assert_eq!(ledger.live_bytes(), 150);

        drop(a);
        assert_eq!(ledger.live_allocations(), 1);
        assert_eq!(ledger.live_bytes(), 50);

        drop(b);
        assert!(ledger.is_empty());
        assert_eq!(ledger.live_bytes(), 0);
    }
}

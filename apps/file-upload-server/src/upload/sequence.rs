//! Temp file sequence allocator
//!
//! A process-wide counter handing out the numeric suffix of every temp file.
//! Allocation is a single `fetch_add`, so concurrent uploads never block on
//! each other and never receive the same value.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic source of temp file sequence numbers
#[derive(Debug)]
pub struct SequenceAllocator {
    next: AtomicU64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Hand out the next sequence number
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Value the next call to [`allocate`](Self::allocate) will return
    #[cfg(test)]
    pub(crate) fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

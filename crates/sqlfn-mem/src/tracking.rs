//! Lightweight live/peak tracking for managed engine blocks.
//!
//! Keep this optional and cheap. Counters are process-wide; tests that assert
//! on them should run in their own binary.

use std::sync::atomic::{AtomicUsize, Ordering};

static GLOBAL: AllocationTracker = AllocationTracker::new();

/// Tracker updated by every managed allocation and engine-driven free.
pub fn global() -> &'static AllocationTracker {
    &GLOBAL
}

#[derive(Debug, Default)]
pub struct AllocationTracker {
    live_blocks: AtomicUsize,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
    total_allocs: AtomicUsize,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationSnapshot {
    pub live_blocks: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub total_allocs: usize,
}

impl AllocationTracker {
    pub const fn new() -> Self {
        Self {
            live_blocks: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
            total_allocs: AtomicUsize::new(0),
        }
    }

    pub fn record_alloc(&self, bytes: usize) {
        self.live_blocks.fetch_add(1, Ordering::AcqRel);
        self.total_allocs.fetch_add(1, Ordering::Relaxed);
        let used = self.live_bytes.fetch_add(bytes, Ordering::AcqRel) + bytes;
        self.record_used(used);
    }

    pub fn record_free(&self, bytes: usize) {
        self.live_blocks.fetch_sub(1, Ordering::AcqRel);
        self.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
    }

    /// Updates peak if `used_bytes` is higher.
    fn record_used(&self, used_bytes: usize) {
        let mut cur = self.peak_bytes.load(Ordering::Relaxed);
        while used_bytes > cur {
            match self.peak_bytes.compare_exchange(
                cur,
                used_bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            used_bytes,
            peak = self.peak_bytes.load(Ordering::Relaxed),
            "managed usage"
        );
    }

    pub fn live_blocks(&self) -> usize {
        self.live_blocks.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> AllocationSnapshot {
        AllocationSnapshot {
            live_blocks: self.live_blocks.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
            total_allocs: self.total_allocs.load(Ordering::Relaxed),
        }
    }
}

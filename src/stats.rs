//! Capture-path counters.
//!
//! Queue-full drops are absorbed at the producer and never surfaced to the
//! consumer as an error; these counters (plus the rate-limited log line)
//! are how that loss is observable.

use core::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one device instance.
#[derive(Debug, Default)]
pub struct CaptureStats {
    captured: AtomicU64,
    dropped: AtomicU64,
    reads: AtomicU64,
    copy_faults: AtomicU64,
}

impl CaptureStats {
    /// Creates a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event accepted into the queue.
    #[inline]
    pub fn record_capture(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one event dropped on a full queue. Returns the running
    /// total, which the caller uses to rate-limit its warning.
    #[inline]
    pub fn record_drop(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records one completed read.
    #[inline]
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one faulted copy into a consumer buffer.
    #[inline]
    pub fn record_copy_fault(&self) {
        self.copy_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Events accepted into the queue.
    #[inline]
    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    /// Events dropped on a full queue.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Completed reads.
    #[inline]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Faulted copies into consumer buffers.
    #[inline]
    pub fn copy_faults(&self) -> u64 {
        self.copy_faults.load(Ordering::Relaxed)
    }
}

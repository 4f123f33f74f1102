//! Bounded FIFO of raw edge-capture events.
//!
//! Exactly one producer (the interrupt handler) pushes; consumers drain.
//! The queue is guarded by a `spin::Mutex` held for O(1) work per call and
//! never across a suspension point, so it is safe to take from interrupt
//! context where sleeping is forbidden.
//!
//! Backpressure policy is drop-on-full: a push against a full queue rejects
//! the incoming event and leaves the buffered sequence untouched. Already
//! buffered events are never evicted or overwritten, so an in-flight
//! consumer drain always sees an uncorrupted FIFO prefix.

use alloc::collections::VecDeque;
use spin::Mutex;

struct Inner {
    buf: VecDeque<u32>,
    capacity: usize,
}

/// Fixed-capacity FIFO of captured edge register values.
pub struct EventQueue {
    inner: Mutex<Inner>,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity),
                capacity,
            }),
        }
    }

    /// Appends one event at the tail.
    ///
    /// Returns `false` (queue unchanged) when already at capacity. Never
    /// blocks; callable from interrupt context.
    pub fn push(&self, event: u32) -> bool {
        let mut inner = self.inner.lock();
        if inner.buf.len() == inner.capacity {
            return false;
        }
        inner.buf.push_back(event);
        true
    }

    /// Removes up to `out.len()` events from the head in FIFO order,
    /// copying them into `out`. Returns the number removed; 0 means empty.
    pub fn pop_all_into(&self, out: &mut [u32]) -> usize {
        let mut inner = self.inner.lock();
        let mut n = 0;
        while n < out.len() {
            match inner.buf.pop_front() {
                Some(event) => {
                    out[n] = event;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    /// Discards all buffered events. No-op when empty.
    pub fn reset(&self) {
        self.inner.lock().buf.clear();
    }

    /// Point-in-time snapshot; may be stale by the time the call returns.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().buf.is_empty()
    }

    /// Point-in-time snapshot; may be stale by the time the call returns.
    pub fn is_full(&self) -> bool {
        let inner = self.inner.lock();
        inner.buf.len() == inner.capacity
    }

    /// Number of buffered events (snapshot).
    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    /// Maximum number of buffered events.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }
}

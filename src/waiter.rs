//! Blocking-wait coordination between the interrupt-context producer and
//! consumer threads.
//!
//! The consumer suspends in [`Waiter::wait_until`]; the producer calls
//! [`Waiter::notify_all`] after a successful push. A notification is only a
//! hint: the waiter always re-tests the predicate before returning success,
//! which is what rules out lost wakeups (a notify landing between the
//! predicate check and the suspend is caught by the next re-test) and
//! spurious wakeups alike.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{CaptureError, CaptureResult};

/// External cancellation signal for blocking waits.
///
/// Set by device teardown, or by the front end on behalf of a consumer that
/// received a termination signal. Once set, every wait observing it fails
/// with [`CaptureError::Interrupted`].
#[derive(Default)]
pub struct AbortFlag(AtomicBool);

impl AbortFlag {
    /// Creates a flag in the not-aborted state.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raises the flag. Non-blocking; safe from any context.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag has been raised.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Wait/notify point. One or more consumers may wait; the producer notifies
/// without blocking.
pub struct Waiter {
    /// Number of suspended consumers.
    waiters: AtomicUsize,
    /// Wakeup hint set by the producer.
    notified: AtomicBool,
}

impl Waiter {
    /// Creates a waiter with no suspended consumers.
    pub const fn new() -> Self {
        Self {
            waiters: AtomicUsize::new(0),
            notified: AtomicBool::new(false),
        }
    }

    /// Suspends the caller until `condition` is observed true.
    ///
    /// The predicate is re-tested after every wakeup before success is
    /// returned. Fails with [`CaptureError::Interrupted`] when `abort` is
    /// observed set first; in that case no side effect has occurred.
    pub fn wait_until<F>(&self, mut condition: F, abort: &AbortFlag) -> CaptureResult
    where
        F: FnMut() -> bool,
    {
        if condition() {
            return Ok(());
        }
        if abort.is_set() {
            return Err(CaptureError::Interrupted);
        }

        self.waiters.fetch_add(1, Ordering::AcqRel);
        let result = loop {
            if condition() {
                break Ok(());
            }
            if abort.is_set() {
                break Err(CaptureError::Interrupted);
            }
            if self.notified.swap(false, Ordering::AcqRel) {
                // Woken; loop back and re-test the predicate.
                continue;
            }
            for _ in 0..100 {
                core::hint::spin_loop();
            }
        };
        self.waiters.fetch_sub(1, Ordering::AcqRel);
        result
    }

    /// Suspends the caller until `condition` is observed true, without a
    /// cancellation path. Used where the wait is known to terminate, such
    /// as draining in-flight accesses during teardown.
    pub fn wait(&self, condition: impl FnMut() -> bool) {
        let never = AbortFlag::new();
        // Cannot fail: the flag is never set.
        let _ = self.wait_until(condition, &never);
    }

    /// Wakes all suspended consumers. Non-blocking; safe from interrupt
    /// context.
    pub fn notify_all(&self) {
        if self.waiters.load(Ordering::Acquire) > 0 {
            self.notified.store(true, Ordering::Release);
        }
    }

    /// Number of currently suspended consumers (snapshot).
    pub fn waiting(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

//! Single-session mutual exclusion for device opens.
//!
//! The gate grants at most one concurrent session: `{Free}` --acquire-->
//! `{Held}` --release--> `{Free}`. It is consumer-side only and is never
//! touched from interrupt context. No queueing order is guaranteed among
//! blocked acquirers beyond what the primitive provides.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::CaptureResult;
use crate::waiter::{AbortFlag, Waiter};

/// Mutual-exclusion lock granting at most one open session.
pub struct SessionGate {
    held: AtomicBool,
    waiter: Waiter,
}

impl SessionGate {
    /// Creates a gate in the free state.
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            waiter: Waiter::new(),
        }
    }

    /// Attempts to take the session slot without blocking.
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Blocks until the session slot is free, then takes it.
    ///
    /// Fails with [`CaptureError::Interrupted`] when `abort` is raised
    /// before the slot is acquired; no side effect occurs in that case.
    pub fn acquire(&self, abort: &AbortFlag) -> CaptureResult {
        loop {
            if self.try_acquire() {
                return Ok(());
            }
            self.waiter
                .wait_until(|| !self.held.load(Ordering::Acquire), abort)?;
            // The slot was observed free, but another acquirer may beat us
            // to it; loop and contend again.
        }
    }

    /// Frees the slot. Must be called exactly once per successful acquire,
    /// including on abnormal exit paths.
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
        self.waiter.notify_all();
    }

    /// Whether the slot is currently held (snapshot).
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

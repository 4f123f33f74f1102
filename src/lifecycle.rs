//! Attach/detach state machine with access tracking.
//!
//! A controller must not be destroyed while the interrupt handler or a
//! consumer is inside it. Every externally-driven entry point brackets its
//! work with `try_begin_access`/`end_access`; detach flips the state to
//! `Removing`, waits for the access count to drain, and only then lets the
//! platform tear the instance down.
//!
//! State and access count live in a single atomic word
//! (`[state(8 bits) | count(24 bits)]`) so the Active check and the count
//! increment happen in one CAS, leaving no window for an access to slip in
//! after the state flips.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::waiter::Waiter;

/// Lifecycle states of a device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceState {
    /// Attached; entry points accept work.
    Active = 0,
    /// Detaching; new work is refused, in-flight work is draining.
    Removing = 1,
    /// Detached; the instance may be destroyed.
    Removed = 2,
}

/// Packed `state | access-count` word.
struct StateAndCount(AtomicU32);

impl StateAndCount {
    const STATE_SHIFT: u32 = 24;
    const COUNT_MASK: u32 = (1 << Self::STATE_SHIFT) - 1;
    const ACTIVE: u32 = 0;
    const REMOVING: u32 = 1;
    const REMOVED: u32 = 2;

    fn new() -> Self {
        Self(AtomicU32::new(Self::ACTIVE << Self::STATE_SHIFT))
    }

    #[inline]
    fn state(&self) -> DeviceState {
        match self.0.load(Ordering::Acquire) >> Self::STATE_SHIFT {
            0 => DeviceState::Active,
            1 => DeviceState::Removing,
            _ => DeviceState::Removed,
        }
    }

    #[inline]
    fn count(&self) -> u32 {
        self.0.load(Ordering::Acquire) & Self::COUNT_MASK
    }

    /// Increment the count iff the state is Active, in one CAS.
    #[inline]
    fn try_acquire(&self) -> bool {
        loop {
            let current = self.0.load(Ordering::Acquire);
            let state = current >> Self::STATE_SHIFT;
            if state != Self::ACTIVE {
                return false;
            }
            let count = current & Self::COUNT_MASK;
            if count == Self::COUNT_MASK {
                return false;
            }
            let next = (state << Self::STATE_SHIFT) | (count + 1);
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(_) => continue,
            }
        }
    }

    #[inline]
    fn release(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }

    /// Flip to Removing, preserving the in-flight count.
    fn set_removing(&self) {
        loop {
            let current = self.0.load(Ordering::Acquire);
            let next = (Self::REMOVING << Self::STATE_SHIFT) | (current & Self::COUNT_MASK);
            if self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    fn set_removed(&self) {
        self.0
            .store(Self::REMOVED << Self::STATE_SHIFT, Ordering::Release);
    }
}

/// Lifecycle tracker for one device instance.
///
/// ```text
/// Active --begin_removal()--> Removing --wait_idle()--> Removed
/// ```
pub struct DeviceLifecycle {
    state_count: StateAndCount,
    idle_waiters: Waiter,
}

impl DeviceLifecycle {
    /// Creates a tracker in the Active state with no accesses.
    pub fn new() -> Self {
        Self {
            state_count: StateAndCount::new(),
            idle_waiters: Waiter::new(),
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> DeviceState {
        self.state_count.state()
    }

    /// Number of in-flight accesses.
    #[inline]
    pub fn active_accesses(&self) -> usize {
        self.state_count.count() as usize
    }

    /// Attempts to enter the device. Returns `false` once removal has begun.
    #[inline]
    pub fn try_begin_access(&self) -> bool {
        self.state_count.try_acquire()
    }

    /// Leaves the device; wakes `wait_idle` when the last access ends.
    #[inline]
    pub fn end_access(&self) {
        self.state_count.release();
        if self.state_count.count() == 0 {
            self.idle_waiters.notify_all();
        }
    }

    /// Flips to Removing so new accesses are refused. Returns `false` when
    /// removal had already begun.
    pub fn begin_removal(&self) -> bool {
        if self.state() != DeviceState::Active {
            return false;
        }
        self.state_count.set_removing();
        true
    }

    /// Waits for all in-flight accesses to drain.
    pub fn wait_idle(&self) {
        self.idle_waiters.wait(|| self.state_count.count() == 0);
    }

    /// Marks the instance Removed. Call only after [`wait_idle`](Self::wait_idle).
    pub fn complete_removal(&self) {
        self.state_count.set_removed();
    }
}

impl Default for DeviceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for DeviceLifecycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceLifecycle")
            .field("state", &self.state())
            .field("active_accesses", &self.active_accesses())
            .finish()
    }
}

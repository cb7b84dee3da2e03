use core::fmt::Debug;

use derive_more::Into;

use crate::utils::*;

const CANCELLED: u64 = 1 << 63;
const WAITING: u64 = 1 << 62;

// 31 bits for the ready counter, 31 bits for the pending counter.
const ONE_READY: u64 = 1 << 31;
const READY_MASK: u64 = ((1 << 31) - 1) << 31;
const ONE_PENDING: u64 = 1;
const PENDING_MASK: u64 = (1 << 31) - 1;

const _: () = {
    assert!(CANCELLED | WAITING | READY_MASK | PENDING_MASK == u64::MAX);
    assert!(READY_MASK & PENDING_MASK == 0);
    assert!((CANCELLED | WAITING) & (READY_MASK | PENDING_MASK) == 0);
};

/// A decoded snapshot of the group status word.
#[derive(Clone, Copy, Into)]
pub(crate) struct GroupStatus(u64);

impl GroupStatus {
    #[inline]
    pub fn is_cancelled(self) -> bool {
        self.0 & CANCELLED != 0
    }

    #[inline]
    pub fn has_waiter(self) -> bool {
        self.0 & WAITING != 0
    }

    #[inline]
    pub fn ready(self) -> u32 {
        ((self.0 & READY_MASK) >> 31) as u32
    }

    #[inline]
    pub fn pending(self) -> u32 {
        (self.0 & PENDING_MASK) as u32
    }

    /// No pending children: nothing to wait for.
    #[inline]
    pub fn is_drained(self) -> bool {
        self.pending() == 0
    }

    /// Status with one ready slot consumed, one pending slot retired and the
    /// waiting bit cleared, all in one step.
    #[inline]
    pub fn completing_ready_waiting(self) -> Self {
        debug_assert!(self.has_waiter());
        debug_assert!(self.ready() >= 1);
        debug_assert!(self.pending() >= 1);
        Self(self.0 - WAITING - ONE_READY - ONE_PENDING)
    }
}

impl Debug for GroupStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "C:{} W:{} R:{} P:{}",
            if self.is_cancelled() { "y" } else { "n" },
            if self.has_waiter() { "y" } else { "n" },
            self.ready(),
            self.pending(),
        )
    }
}

/// The atomic status word all cross-thread coordination is routed through.
///
/// Every method returns the *assumed* post-state for the caller to reason
/// about; the word may have moved on by the time the caller looks at it.
pub(crate) struct StatusWord(AtomicU64);

impl StatusWord {
    #[cfg(not(loom))]
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[cfg(loom)]
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn load_relaxed(&self) -> GroupStatus {
        GroupStatus(self.0.load(atomic::Relaxed))
    }

    /// Set the cancelled bit. Returns the previous state so the caller can
    /// tell whether it was the first to cancel.
    #[inline]
    pub fn mark_cancelled(&self) -> GroupStatus {
        GroupStatus(self.0.fetch_or(CANCELLED, atomic::Relaxed))
    }

    /// Set the waiting bit. Only the (single) consumer calls this.
    #[inline]
    pub fn mark_waiting(&self) -> GroupStatus {
        GroupStatus(self.0.fetch_or(WAITING, atomic::Acquire) | WAITING)
    }

    /// Clear the waiting bit; used when the consumer bails out of parking.
    #[inline]
    pub fn clear_waiting(&self) -> GroupStatus {
        GroupStatus(self.0.fetch_and(!WAITING, atomic::Release))
    }

    /// Enroll one pending child. If the group is already cancelled the add
    /// is rolled back; the returned state then reports cancellation and the
    /// caller must not schedule the child.
    #[inline]
    pub fn add_pending(&self) -> GroupStatus {
        let s = GroupStatus(self.0.fetch_add(ONE_PENDING, atomic::Relaxed) + ONE_PENDING);
        if s.is_cancelled() {
            return GroupStatus(self.0.fetch_sub(ONE_PENDING, atomic::Relaxed) - ONE_PENDING);
        }
        s
    }

    /// Count one completed child as ready.
    #[inline]
    pub fn add_ready(&self) -> GroupStatus {
        let s = GroupStatus(self.0.fetch_add(ONE_READY, atomic::Acquire) + ONE_READY);
        debug_assert!(s.ready() <= s.pending());
        s
    }

    /// Try to move from `assumed` to `assumed.completing_ready_waiting()`.
    /// On failure `assumed` is refreshed to the observed state. Weak; the
    /// caller loops.
    #[inline]
    pub fn complete_ready_waiting(&self, assumed: &mut GroupStatus) -> bool {
        let target = assumed.completing_ready_waiting();
        match self.0.compare_exchange_weak(
            assumed.0,
            target.0,
            atomic::Relaxed,
            atomic::Acquire,
        ) {
            Ok(_) => true,
            Err(current) => {
                assumed.0 = current;
                false
            }
        }
    }
}

impl Debug for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.load_relaxed(), f)
    }
}

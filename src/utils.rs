#[cfg(all(not(loom), not(feature = "portable-atomic")))]
pub use core::sync::atomic::{self as _atomic, AtomicPtr, AtomicU8, AtomicU64, AtomicUsize};
#[cfg(all(not(loom), feature = "portable-atomic"))]
pub use portable_atomic::{self as _atomic, AtomicPtr, AtomicU8, AtomicU64, AtomicUsize};
#[cfg(loom)]
pub use loom::sync::atomic::{self as _atomic, AtomicPtr, AtomicU8, AtomicU64, AtomicUsize};

pub mod atomic {
    pub use super::_atomic::{Ordering::*, fence};
}

#[cfg(not(loom))]
pub use core::cell::UnsafeCell;
#[cfg(loom)]
pub use loom::cell::UnsafeCell;

/// Mutable access to an `UnsafeCell` slot, bridging the loom API.
///
/// # Safety
///
/// The caller must guarantee exclusive access to the cell for the duration
/// of `f` (single consumer, or a claimed waiter, or a held lock bit).
#[inline]
pub unsafe fn with_cell_mut<T, R, F: FnOnce(&mut T) -> R>(cell: &UnsafeCell<T>, f: F) -> R {
    #[cfg(not(loom))]
    {
        f(unsafe { &mut *cell.get() })
    }
    #[cfg(loom)]
    {
        cell.with_mut(|ptr| f(unsafe { &mut *ptr }))
    }
}

/// Back off inside a bounded protocol window (mark-waiting to park, or
/// add-ready to enqueue). Under loom this must yield so the model can run
/// the thread we are waiting on.
#[inline]
pub fn spin_yield() {
    #[cfg(not(loom))]
    core::hint::spin_loop();
    #[cfg(loom)]
    loom::thread::yield_now();
}

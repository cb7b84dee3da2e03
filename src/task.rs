use core::ptr::NonNull;

use derive_more::Debug;

/// Handle to a reference-counted task object.
///
/// Cloning the handle acquires one reference; dropping it releases one. The
/// raw round-trip lets the group park a handle in a single pointer-sized
/// slot and pack it next to a two-bit tag.
///
/// [`TaskArc`](crate::TaskArc) implements this contract and is the easiest
/// way to satisfy it.
///
/// # Safety
///
/// - `into_raw` must return a pointer aligned to at least 4 bytes, leaving
///   the low two bits free for tagging, and `as_raw` must report the same
///   pointer `into_raw` would.
/// - `from_raw(into_raw(h))` must yield a handle owning the same reference
///   `h` owned; neither conversion may touch the reference count.
/// - The pointer must stay valid for as long as any reference (converted or
///   not) is outstanding.
pub unsafe trait RawTask: Clone + Send + Sync {
    /// The pointer this handle would convert into, without giving up the
    /// reference. Every clone of a handle observes the same pointer.
    fn as_raw(this: &Self) -> NonNull<()>;

    /// Surrender this handle as a raw pointer without releasing its
    /// reference.
    fn into_raw(this: Self) -> NonNull<()>;

    /// Rebuild a handle from a pointer produced by [`into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` and the reference it carried must not
    /// have been reclaimed through another `from_raw` call.
    ///
    /// [`into_raw`]: RawTask::into_raw
    unsafe fn from_raw(ptr: NonNull<()>) -> Self;
}

/// A child task observed through its owning group.
///
/// The group only ever asks a child to cancel; completion arrives from the
/// outside through [`TaskGroup::offer`](crate::TaskGroup::offer), carrying
/// the child's handle back together with its success-vs-error tag. The
/// result value itself stays inside the child's future fragment and is read
/// by whoever consumes the handle.
pub trait ChildTask: RawTask {
    /// Ask the child to cancel. Must be idempotent, and harmless on a child
    /// that has already completed.
    fn signal_cancel(&self);
}

/// The parent task while it interacts with `next()`.
///
/// When a producer completes a parked waiter, it first writes the outcome
/// into the waiter's resume context via [`fill_result`], then hands the
/// waiter to the executor. `fill_result` is never called with
/// [`PollResult::MustWait`].
///
/// [`fill_result`]: WaiterTask::fill_result
pub trait WaiterTask: RawTask {
    type Child: ChildTask;

    /// Write the outcome of a completed `next()` into the resume context.
    fn fill_result(&self, result: PollResult<Self::Child>);
}

/// Schedules a task for resumption on some thread.
pub trait Executor<T> {
    fn enqueue(&self, task: T);
}

/// The parent's status-record machinery.
///
/// A group registers itself on creation and unregisters on destruction so
/// that cancellation traversal started above the parent reaches every child
/// in the group. The record pointer is opaque to the group; the host only
/// needs it for identity.
pub trait StatusRecordHost {
    fn register(&self, record: NonNull<()>);
    fn unregister(&self, record: NonNull<()>);
}

/// The outcome of one poll of `next()`.
///
/// `Success` and `Error` carry the retained completed child; dropping the
/// handle releases the reference the group held for it. `Empty` carries
/// nothing: the group is drained and there is no task and no storage to
/// hand over.
#[derive(Debug)]
pub enum PollResult<C> {
    /// The group has no pending children; `next()` yields nothing.
    #[debug("Empty")]
    Empty,
    /// The caller has been parked and will be resumed by a completion.
    #[debug("MustWait")]
    MustWait,
    /// A child completed with a value, readable through its future fragment.
    #[debug("Success")]
    Success(C),
    /// A child completed with an error.
    #[debug("Error")]
    Error(C),
}

impl<C> PollResult<C> {
    /// Tag a completed child with its success-vs-error status.
    #[inline]
    pub fn completed(task: C, had_error: bool) -> Self {
        if had_error {
            Self::Error(task)
        } else {
            Self::Success(task)
        }
    }
}

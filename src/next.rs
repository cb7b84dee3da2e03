use core::{
    fmt::Debug,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use crate::{
    group::TaskGroup,
    task::{ChildTask, Executor, PollResult, WaiterTask},
    task_arc::TaskArc,
    utils::*,
};

const DONE: u8 = 0b01;
const LOCK: u8 = 0b10;

/// Waker-backed waiter handle, the form `next()` parks when awaited as a
/// future.
pub type NextHandle<C> = TaskArc<NextWaiter<C>>;

/// Resume context of a parent awaiting `next()` as a future.
///
/// The completion that claims the waiter fills `result` and then publishes
/// `DONE`, waking the registered waker; the future re-registers its waker
/// under the `LOCK` bit on every poll.
pub struct NextWaiter<C: ChildTask> {
    state: AtomicU8,
    waker: UnsafeCell<Option<Waker>>,
    result: UnsafeCell<Option<PollResult<C>>>,
}

unsafe impl<C: ChildTask> Send for NextWaiter<C> {}
unsafe impl<C: ChildTask> Sync for NextWaiter<C> {}

impl<C: ChildTask> NextWaiter<C> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
            waker: UnsafeCell::new(None),
            result: UnsafeCell::new(None),
        }
    }

    /// Publish the filled result and wake the registered waker, unless the
    /// consumer holds the lock (it will observe `DONE` when it releases).
    fn complete(&self) {
        let prev = self.state.fetch_or(DONE | LOCK, atomic::AcqRel);
        if prev & LOCK == 0
            && let Some(waker) = unsafe { with_cell_mut(&self.waker, |slot| slot.take()) }
        {
            waker.wake();
        }
    }

    /// Take the filled result. Only call after observing `DONE`.
    fn take_result(&self) -> PollResult<C> {
        let result = unsafe { with_cell_mut(&self.result, |slot| slot.take()) };
        debug_assert!(result.is_some());
        result.unwrap_or(PollResult::Empty)
    }
}

impl<C: ChildTask> WaiterTask for TaskArc<NextWaiter<C>> {
    type Child = C;

    fn fill_result(&self, result: PollResult<C>) {
        // Sole writer: only the completion that claimed this waiter (or the
        // immediate path, before the handle is shared) fills the slot, and
        // the consumer reads it only after `DONE` is published.
        unsafe { with_cell_mut(&self.result, |slot| *slot = Some(result)) };
    }
}

impl<C: ChildTask> Debug for NextWaiter<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NextWaiter")
            .field("done", &(self.state.load(atomic::Relaxed) & DONE != 0))
            .finish()
    }
}

/// Executor for waker-backed waiters: scheduling the parent for resumption
/// means publishing its filled result and waking the waker its [`Next`]
/// future registered.
#[derive(Clone, Copy, Debug, Default)]
pub struct WakerExecutor;

impl<C: ChildTask> Executor<NextHandle<C>> for WakerExecutor {
    fn enqueue(&self, task: NextHandle<C>) {
        task.complete();
    }
}

impl<C: ChildTask> TaskGroup<C, NextHandle<C>> {
    /// Waits for the next child to complete.
    ///
    /// Resolves to `Some(Ok(child))` or `Some(Err(child))` for a completed
    /// child (the result value is read through the child's own future
    /// fragment), or `None` once no children are pending. After resolving,
    /// further polls yield `None`.
    ///
    /// Completions offered on other threads must pass [`WakerExecutor`] so
    /// the handoff wakes this future.
    ///
    /// # Cancellation safety
    ///
    /// Dropping the future un-parks it. A completion that claimed the
    /// waiter at the very instant of the drop is released, not delivered;
    /// every other completion stays in the group for the next call.
    pub fn next(&self) -> Next<'_, C> {
        Next {
            group: self,
            waiter: TaskArc::new(NextWaiter::new()),
            parked: false,
            terminated: false,
        }
    }
}

/// Future returned by [`TaskGroup::next`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Next<'a, C: ChildTask> {
    group: &'a TaskGroup<C, NextHandle<C>>,
    waiter: NextHandle<C>,
    parked: bool,
    terminated: bool,
}

impl<C: ChildTask> Future for Next<'_, C> {
    type Output = Option<Result<C, C>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if this.terminated {
            return Poll::Ready(None);
        }

        // Register the waker before touching the group so a completion
        // racing with this poll is never lost.
        let prev = this.waiter.state.fetch_or(LOCK, atomic::Acquire);
        if prev & DONE != 0 {
            this.terminated = true;
            return Poll::Ready(into_output(this.waiter.take_result()));
        }
        debug_assert!(prev & LOCK == 0);

        unsafe {
            with_cell_mut(&this.waiter.waker, |slot| {
                match slot {
                    Some(old) if old.will_wake(cx.waker()) => {}
                    _ => {
                        *slot = Some(cx.waker().clone());
                    }
                };
            });
        }

        let prev = this.waiter.state.fetch_and(!LOCK, atomic::AcqRel);
        if prev & DONE != 0 {
            drop(unsafe { with_cell_mut(&this.waiter.waker, |slot| slot.take()) });
            this.waiter.state.fetch_or(LOCK, atomic::Release);
            this.terminated = true;
            return Poll::Ready(into_output(this.waiter.take_result()));
        }

        if this.parked {
            return Poll::Pending;
        }
        match this.group.poll_next(this.waiter.clone()) {
            PollResult::MustWait => {
                this.parked = true;
                Poll::Pending
            }
            result => {
                this.terminated = true;
                Poll::Ready(into_output(result))
            }
        }
    }
}

impl<C: ChildTask> Drop for Next<'_, C> {
    fn drop(&mut self) {
        if self.parked && !self.terminated {
            self.group.retract_waiter(&self.waiter);
        }
    }
}

#[cfg(feature = "futures-core")]
impl<C: ChildTask> futures_core::FusedFuture for Next<'_, C> {
    #[inline]
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<C: ChildTask> Debug for Next<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Next")
            .field("parked", &self.parked)
            .field("terminated", &self.terminated)
            .finish()
    }
}

fn into_output<C>(result: PollResult<C>) -> Option<Result<C, C>> {
    match result {
        PollResult::Empty => None,
        PollResult::Success(task) => Some(Ok(task)),
        PollResult::Error(task) => Some(Err(task)),
        PollResult::MustWait => {
            debug_assert!(false, "converting a waiting poll into an output");
            None
        }
    }
}

use core::{
    fmt::Debug,
    marker::PhantomData,
    ptr::{self, NonNull},
};

use alloc::boxed::Box;

use crate::{
    next::NextHandle,
    queue::MpscQueue,
    ready::ReadyItem,
    record::ChildRecord,
    status::StatusWord,
    task::{ChildTask, Executor, PollResult, StatusRecordHost, WaiterTask},
    utils::*,
};

/// A group of child tasks whose completions are observed by a single
/// parent.
///
/// Children are enrolled with [`add_pending`] before they are scheduled and
/// deposit their results with [`offer`] on whatever thread they complete
/// on. The parent consumes results in completion order through
/// [`poll_next`] / [`wait_next`] (or the [`next`] future), and cannot be
/// past the group's lifetime while any child is still pending.
///
/// At most one consumer may interact with `next()` at a time; the
/// surrounding scope is responsible for upholding this.
///
/// # Examples
///
/// ```rust
/// use compact_taskgroup::{ChildTask, TaskArc, TaskGroup, WakerExecutor};
///
/// struct Fetch {
///     value: u32,
/// }
///
/// impl ChildTask for TaskArc<Fetch> {
///     fn signal_cancel(&self) {}
/// }
///
/// # futures_executor::block_on(async {
/// let group = TaskGroup::<TaskArc<Fetch>>::new();
///
/// assert!(group.add_pending());
/// let child = TaskArc::new(Fetch { value: 7 });
/// group.attach_child(child.clone());
///
/// // ... the child runs elsewhere and eventually completes:
/// group.offer(child, false, &WakerExecutor);
///
/// let polled = group.next().await.unwrap().ok().unwrap();
/// assert_eq!(polled.value, 7);
///
/// // the group is drained
/// assert!(group.next().await.is_none());
/// assert!(group.is_empty());
/// # });
/// ```
///
/// [`add_pending`]: TaskGroup::add_pending
/// [`offer`]: TaskGroup::offer
/// [`poll_next`]: TaskGroup::poll_next
/// [`wait_next`]: TaskGroup::wait_next
/// [`next`]: TaskGroup::next
pub struct TaskGroup<C: ChildTask, W: WaiterTask<Child = C> = NextHandle<C>> {
    /// The packed coordination word: cancelled and waiting bits plus the
    /// ready and pending counters.
    status: StatusWord,
    /// Completed children awaiting consumption, in offer-arrival order.
    ready: MpscQueue<ReadyItem<C>>,
    /// The single parked consumer, or null.
    waiter: AtomicPtr<()>,
    /// Children recorded for cancellation traversal.
    children: ChildRecord<C>,
    _waiter: PhantomData<W>,
}

unsafe impl<C: ChildTask, W: WaiterTask<Child = C>> Send for TaskGroup<C, W> {}
unsafe impl<C: ChildTask, W: WaiterTask<Child = C>> Sync for TaskGroup<C, W> {}

impl<C: ChildTask, W: WaiterTask<Child = C>> TaskGroup<C, W> {
    /// Creates an empty group: no children, not cancelled, no waiter.
    pub fn new() -> Self {
        Self {
            status: StatusWord::new(),
            ready: MpscQueue::new(),
            waiter: AtomicPtr::new(ptr::null_mut()),
            children: ChildRecord::new(),
            _waiter: PhantomData,
        }
    }

    /// Creates a group and registers it with the parent's status-record
    /// machinery, so cancellation traversal from above reaches the group's
    /// children. Tear it down with [`destroy`](TaskGroup::destroy).
    pub fn create<P: StatusRecordHost>(parent: &P) -> Box<Self> {
        let group = Box::new(Self::new());
        parent.register(NonNull::from(&*group).cast());
        group
    }

    /// Unregisters the group and tears it down, releasing every completion
    /// still parked in the ready queue.
    ///
    /// The surrounding scope must have drained or awaited all children;
    /// destroying a group with pending children is a programmer error and
    /// is not re-checked here.
    pub fn destroy<P: StatusRecordHost>(self: Box<Self>, parent: &P) {
        parent.unregister(NonNull::from(&*self).cast());
        // dropping the box drains the ready queue and the child record
    }

    /// Enrolls one child before it is scheduled.
    ///
    /// Returns `false` if the group has been cancelled; the enrollment is
    /// rolled back and the caller must not schedule the child.
    pub fn add_pending(&self) -> bool {
        !self.status.add_pending().is_cancelled()
    }

    /// Records a scheduled child so [`cancel_all`](TaskGroup::cancel_all)
    /// reaches it. The pending count is untouched; the preceding
    /// [`add_pending`](TaskGroup::add_pending) already moved it.
    pub fn attach_child(&self, child: C) {
        self.children.attach(child);
    }

    /// `true` when no children are pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.status.load_relaxed().is_drained()
    }

    /// `true` once the group has been asked to cancel.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status.load_relaxed().is_cancelled()
    }

    /// Cancels the group and signals every recorded child.
    ///
    /// Returns `true` only for the first call. Enrolling new children fails
    /// from here on, but in-flight children are not interrupted: they still
    /// complete (typically with an error) and offer their results, which
    /// `next()` keeps draining.
    pub fn cancel_all(&self) -> bool {
        if self.status.mark_cancelled().is_cancelled() {
            return false;
        }
        self.children.for_each(|child| child.signal_cancel());
        true
    }

    /// Deposits a completed child into the group.
    ///
    /// Called exactly once per successfully enrolled child, on whatever
    /// thread it completed on. `completed` is the one owned reference the
    /// group takes over; it is handed to the consumer (directly, or through
    /// the ready queue) and released when the consumer drops it.
    ///
    /// If the parent is parked inside `next()`, this completion claims it,
    /// fills its resume context and hands it to `executor`. Otherwise the
    /// completion is parked in the ready queue in arrival order.
    pub fn offer<E: Executor<W>>(&self, completed: C, had_error: bool, executor: &E) {
        let mut assumed = self.status.add_ready();

        // a) the parent is (or is about to be) parked: claim it and
        // complete it right away.
        while assumed.has_waiter() {
            debug_assert!(assumed.pending() >= 1);
            let Some(head) = NonNull::new(self.waiter.load(atomic::Acquire)) else {
                // The waiting bit is up but the consumer has not stored
                // itself yet, or it is mid fast-path and will drop the bit.
                // Either resolves in a bounded number of its steps.
                spin_yield();
                assumed = self.status.load_relaxed();
                continue;
            };
            if self
                .waiter
                .compare_exchange_weak(
                    head.as_ptr(),
                    ptr::null_mut(),
                    atomic::Release,
                    atomic::Acquire,
                )
                .is_err()
            {
                // another completion claimed the parent first
                assumed = self.status.load_relaxed();
                continue;
            }

            // The parked reference is ours, so nothing else can clear the
            // waiting bit: this can only lose to counter movement.
            while !self.status.complete_ready_waiting(&mut assumed) {}

            let waiting = unsafe { W::from_raw(head) };
            waiting.fill_result(PollResult::completed(completed, had_error));
            executor.enqueue(waiting);
            return;
        }

        // b) no waiter: the reference moves into the ready queue until a
        // `next()` picks it up.
        self.ready.enqueue(ReadyItem::new(completed, had_error));
    }

    /// One poll of `next()`.
    ///
    /// Returns [`PollResult::Empty`] when no children are pending, a
    /// completion when one is ready, or [`PollResult::MustWait`] after
    /// parking `waiting`: the next completion claims the parked task, fills
    /// its resume context and hands it to the offer's executor.
    pub fn poll_next(&self, waiting: W) -> PollResult<C> {
        let mut assumed = self.status.mark_waiting();

        loop {
            // 1) drained: nothing pending, so nothing to suspend for.
            if assumed.is_drained() {
                self.status.clear_waiting();
                return PollResult::Empty;
            }

            // 2) a completion is counted ready: consume it without parking.
            if assumed.ready() >= 1 {
                if !self.status.complete_ready_waiting(&mut assumed) {
                    continue;
                }
                loop {
                    // A successful claim proves some completion is past its
                    // ready increment; its enqueue may still be in flight.
                    if let Some(item) = unsafe { self.ready.dequeue() } {
                        let (task, had_error) = item.into_parts();
                        return PollResult::completed(task, had_error);
                    }
                    spin_yield();
                }
            }

            // 3) nothing ready: park and let a completion claim us.
            let raw = W::into_raw(waiting).as_ptr();
            let mut head = ptr::null_mut();
            loop {
                match self
                    .waiter
                    .compare_exchange_weak(head, raw, atomic::Release, atomic::Acquire)
                {
                    Ok(_) => return PollResult::MustWait,
                    Err(current) => {
                        // single consumer: the slot can only be empty here
                        debug_assert!(current.is_null());
                        head = current;
                    }
                }
            }
        }
    }

    /// The async-callable form of `next()`.
    ///
    /// `waiting` either parks (a completion will fill its resume context
    /// and enqueue it on the offer side's executor), or completes
    /// immediately: the outcome is filled in and the task goes to
    /// `executor` right away.
    pub fn wait_next<E: Executor<W>>(&self, waiting: W, executor: &E) {
        match self.poll_next(waiting.clone()) {
            PollResult::MustWait => {}
            result => {
                waiting.fill_result(result);
                executor.enqueue(waiting);
            }
        }
    }

    /// Withdraws a parked waiter that stopped listening.
    ///
    /// If a completion claimed the waiter first this is a no-op; the filled
    /// result is then released unconsumed when the waiter itself drops.
    pub(crate) fn retract_waiter(&self, waiting: &W) {
        let raw = W::as_raw(waiting).as_ptr();
        if self
            .waiter
            .compare_exchange(raw, ptr::null_mut(), atomic::Acquire, atomic::Relaxed)
            .is_ok()
        {
            self.status.clear_waiting();
            // the slot held one reference
            drop(unsafe { W::from_raw(NonNull::new_unchecked(raw)) });
        }
    }
}

impl<C: ChildTask, W: WaiterTask<Child = C>> Default for TaskGroup<C, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ChildTask, W: WaiterTask<Child = C>> Drop for TaskGroup<C, W> {
    fn drop(&mut self) {
        // A parked waiter cannot outlive its group's scope; still, drain
        // the slot so a mid-teardown reference is not leaked.
        if let Some(head) = NonNull::new(self.waiter.load(atomic::Relaxed)) {
            drop(unsafe { W::from_raw(head) });
        }
        // ready queue and child record drain in their own `Drop` impls
    }
}

impl<C: ChildTask, W: WaiterTask<Child = C>> Debug for TaskGroup<C, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskGroup")
            .field("status", &self.status)
            .finish()
    }
}

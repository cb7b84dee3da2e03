use core::ptr;

use alloc::boxed::Box;

use crate::{task::ChildTask, utils::*};

struct ChildNode<C> {
    child: C,
    next: *mut ChildNode<C>,
}

/// Prepend-only list of the children attached to a group, walked by
/// cancellation traversal.
///
/// Attachment happens from the parent only, but the walk may race with it
/// from any thread, so publication goes through the head pointer. Nodes are
/// never unlinked individually; each node's reference is released when the
/// group is torn down.
pub(crate) struct ChildRecord<C> {
    head: AtomicPtr<ChildNode<C>>,
}

unsafe impl<C: Send> Send for ChildRecord<C> {}
unsafe impl<C: Send> Sync for ChildRecord<C> {}

impl<C: ChildTask> ChildRecord<C> {
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Record a child so cancellation traversal reaches it.
    pub fn attach(&self, child: C) {
        let node = Box::into_raw(Box::new(ChildNode {
            child,
            next: ptr::null_mut(),
        }));
        let mut head = self.head.load(atomic::Relaxed);
        loop {
            unsafe { (*node).next = head };
            match self
                .head
                .compare_exchange_weak(head, node, atomic::Release, atomic::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    /// Visit every attached child. A child attached concurrently with the
    /// walk may be missed; callers must order their own barrier (the
    /// cancelled bit) ahead of the walk.
    pub fn for_each(&self, mut f: impl FnMut(&C)) {
        let mut node = self.head.load(atomic::Acquire);
        while !node.is_null() {
            let n = unsafe { &*node };
            f(&n.child);
            node = n.next;
        }
    }
}

impl<C> Drop for ChildRecord<C> {
    fn drop(&mut self) {
        let mut node = self.head.load(atomic::Relaxed);
        while !node.is_null() {
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next;
        }
    }
}

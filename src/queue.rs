//! A non-intrusive MPSC FIFO in the style of [Vyukov's queue][1].
//!
//! Many producers (completing children) race on `enqueue`; exactly one
//! consumer (the parent inside `next()`) calls `dequeue`. Delivery order is
//! enqueue-arrival order.
//!
//! [1]: https://www.1024cores.net/home/lock-free-algorithms/queues/non-intrusive-mpsc-node-based-queue

use core::ptr;

use alloc::boxed::Box;

use crate::utils::*;

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    item: Option<T>,
}

impl<T> Node<T> {
    fn alloc(item: Option<T>) -> *mut Self {
        Box::into_raw(Box::new(Self {
            next: AtomicPtr::new(ptr::null_mut()),
            item,
        }))
    }
}

pub(crate) struct MpscQueue<T> {
    /// Producer end; the most recently linked node.
    tail: AtomicPtr<Node<T>>,
    /// Consumer end; the current stub node. Touched only by the single
    /// consumer (or by `Drop`, which holds `&mut self`).
    head: UnsafeCell<*mut Node<T>>,
}

unsafe impl<T: Send> Send for MpscQueue<T> {}
unsafe impl<T: Send> Sync for MpscQueue<T> {}

impl<T> MpscQueue<T> {
    pub fn new() -> Self {
        let stub = Node::alloc(None);
        Self {
            tail: AtomicPtr::new(stub),
            head: UnsafeCell::new(stub),
        }
    }

    /// Link `item` at the producer end. Never blocks; the two-step swap
    /// leaves a short window in which the item is counted but not yet
    /// reachable from the consumer end.
    pub fn enqueue(&self, item: T) {
        let node = Node::alloc(Some(item));
        let prev = self.tail.swap(node, atomic::AcqRel);
        // `prev` is unreachable for every other producer after the swap; the
        // consumer parks on a null `next` until this store lands.
        unsafe { (*prev).next.store(node, atomic::Release) };
    }

    /// Pop the oldest item, or `None` if the queue is empty *or* a producer
    /// has swapped the tail but not yet linked its node.
    ///
    /// # Safety
    ///
    /// Must only be called from the single consumer.
    pub unsafe fn dequeue(&self) -> Option<T> {
        unsafe {
            with_cell_mut(&self.head, |head| {
                let stub = *head;
                let next = unsafe { (*stub).next.load(atomic::Acquire) };
                if next.is_null() {
                    return None;
                }
                let item = unsafe { (*next).item.take() };
                debug_assert!(item.is_some());
                // The drained node becomes the new stub; the old one is ours
                // to free.
                *head = next;
                drop(unsafe { Box::from_raw(stub) });
                item
            })
        }
    }
}

impl<T> Drop for MpscQueue<T> {
    fn drop(&mut self) {
        // `&mut self` excludes producers; walk the chain and free every
        // node, dropping items that were never consumed.
        unsafe {
            with_cell_mut(&self.head, |head| {
                let mut node = *head;
                while !node.is_null() {
                    let next = unsafe { (*node).next.load(atomic::Relaxed) };
                    drop(unsafe { Box::from_raw(node) });
                    node = next;
                }
            });
        }
    }
}

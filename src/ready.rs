use core::{marker::PhantomData, ptr::NonNull};

use crate::task::RawTask;

const STATUS_MASK: usize = 0b11;

/// Success-vs-error tag of a queued completion. The discriminants share the
/// value space of the poll outcome tags; `0b00`/`0b01` are never packed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(usize)]
pub(crate) enum ReadyStatus {
    Success = 0b10,
    Error = 0b11,
}

/// A completed child parked in the ready queue, packed into one word: the
/// low two bits carry the status, the high bits the task pointer (the
/// [`RawTask`] alignment contract keeps them free).
///
/// The item owns one reference to the task. Dropping an unconsumed item
/// releases that reference; `into_parts` transfers it to the consumer.
pub(crate) struct ReadyItem<C: RawTask> {
    storage: usize,
    _marker: PhantomData<C>,
}

impl<C: RawTask> ReadyItem<C> {
    pub fn new(task: C, had_error: bool) -> Self {
        let ptr = C::into_raw(task).as_ptr() as usize;
        debug_assert!(ptr & STATUS_MASK == 0);
        let status = if had_error {
            ReadyStatus::Error
        } else {
            ReadyStatus::Success
        };
        Self {
            storage: ptr | status as usize,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn status(&self) -> ReadyStatus {
        match self.storage & STATUS_MASK {
            0b11 => ReadyStatus::Error,
            tag => {
                debug_assert_eq!(tag, 0b10);
                ReadyStatus::Success
            }
        }
    }

    /// Unpack into the owned task reference and its error flag.
    #[inline]
    pub fn into_parts(self) -> (C, bool) {
        let had_error = self.status() == ReadyStatus::Error;
        let ptr = (self.storage & !STATUS_MASK) as *mut ();
        core::mem::forget(self);
        let task = unsafe { C::from_raw(NonNull::new_unchecked(ptr)) };
        (task, had_error)
    }
}

impl<C: RawTask> Drop for ReadyItem<C> {
    #[inline]
    fn drop(&mut self) {
        let ptr = (self.storage & !STATUS_MASK) as *mut ();
        drop(unsafe { C::from_raw(NonNull::new_unchecked(ptr)) });
    }
}

//! A compact structured-concurrency task group primitive.
//!
//! A [`TaskGroup`] owns a dynamic set of child tasks spawned from a single
//! parent, collects their completions in arrival order, and keeps the
//! parent from leaving the group's scope while any child is pending. It is
//! the coordination core of fan-out/fan-in concurrency: children complete
//! on arbitrary threads and either rendezvous directly with the parked
//! parent or park their result in a lock-free ready queue.
//!
//! This crate is designed to be lightweight and executor-agnostic. It works
//! with any `async` runtime and supports `no_std` environments (requires
//! `alloc`). All coordination is routed through one atomic 64-bit status
//! word; there is no mutex.
//!
//! # Usage
//!
//! The group is generic over the runtime's task handles (the [`ChildTask`]
//! and [`WaiterTask`] contracts). [`TaskArc`] is the crate-provided handle
//! type, and the default waiter is the waker-backed one behind
//! [`TaskGroup::next`]:
//!
//! ```rust
//! use compact_taskgroup::{ChildTask, TaskArc, TaskGroup, WakerExecutor};
//!
//! struct Job {
//!     result: u32,
//! }
//!
//! impl ChildTask for TaskArc<Job> {
//!     fn signal_cancel(&self) {}
//! }
//!
//! # futures_executor::block_on(async {
//! let group = TaskGroup::<TaskArc<Job>>::new();
//!
//! for result in [10, 20, 30] {
//!     assert!(group.add_pending());
//!     let child = TaskArc::new(Job { result });
//!     group.attach_child(child.clone());
//!     // a real runtime completes the child elsewhere:
//!     group.offer(child, false, &WakerExecutor);
//! }
//!
//! let mut collected = 0;
//! while let Some(done) = group.next().await {
//!     collected += done.ok().unwrap().result;
//! }
//! assert_eq!(collected, 60);
//! assert!(group.is_empty());
//! # });
//! ```
//!
//! Cancellation is cooperative: [`TaskGroup::cancel_all`] marks the group
//! and signals recorded children, further [`TaskGroup::add_pending`] calls
//! fail, and in-flight children still offer their (typically error-shaped)
//! results for the parent to drain.
//!
//! # Features
//!
//! - `portable-atomic`: use `portable-atomic` on targets without native
//!   64-bit atomics.
//! - `futures-core`: implement `futures_core::FusedFuture` for [`Next`].
#![no_std]
extern crate alloc;

mod group;
mod next;
mod queue;
mod ready;
mod record;
mod status;
mod task;
mod task_arc;
mod utils;

pub use crate::{
    group::TaskGroup,
    next::{Next, NextHandle, NextWaiter, WakerExecutor},
    task::{ChildTask, Executor, PollResult, RawTask, StatusRecordHost, WaiterTask},
    task_arc::TaskArc,
};

#[cfg(test)]
mod tests;

use crate::{
    group::TaskGroup,
    task::PollResult,
    tests::utils::{Canary, CountingExecutor, TestTask, TestWaiter, TestWaiterInner, child},
};

fn group() -> TaskGroup<TestTask, TestWaiter> {
    TaskGroup::new()
}

#[cfg_attr(not(loom), test)]
pub fn test_cancel_before_spawn() {
    let g = group();

    assert!(g.cancel_all());
    assert!(g.is_cancelled());
    assert!(!g.add_pending());
    // the rolled-back enrollment left the group drained
    assert!(g.is_empty());

    // only the first cancellation reports doing anything
    assert!(!g.cancel_all());
}

#[cfg_attr(not(loom), test)]
pub fn test_cancel_signals_recorded_children() {
    let canary = Canary::new();
    let g = group();

    let mut children = alloc::vec::Vec::new();
    for value in [1, 2, 3] {
        assert!(g.add_pending());
        let task = child(value, &canary);
        g.attach_child(task.clone());
        children.push(task);
    }
    assert!(children.iter().all(|task| !task.was_cancelled()));

    assert!(g.cancel_all());
    assert!(children.iter().all(|task| task.was_cancelled()));
}

#[cfg_attr(not(loom), test)]
pub fn test_cancel_with_children_in_flight() {
    let canary = Canary::new();
    let exec = CountingExecutor::new();
    let g = group();

    assert!(g.add_pending());
    assert!(g.add_pending());
    let first = child(1, &canary);
    let second = child(2, &canary);
    g.attach_child(first.clone());
    g.attach_child(second.clone());

    assert!(g.cancel_all());
    assert!(!g.is_empty());

    // cancelled children still complete and offer, typically with errors
    g.offer(first, true, &exec);
    g.offer(second, true, &exec);

    let waiter = TestWaiterInner::new();
    for expected in [1, 2] {
        match g.poll_next(waiter.clone()) {
            PollResult::Error(task) => {
                assert!(task.was_cancelled());
                assert_eq!(task.value(), expected);
            }
            other => panic!("expected a cancelled child's error, got {other:?}"),
        }
    }
    match g.poll_next(waiter.clone()) {
        PollResult::Empty => {}
        other => panic!("expected a drained group, got {other:?}"),
    }
    assert!(g.is_empty());
    assert!(g.is_cancelled());
}

#[cfg_attr(not(loom), test)]
pub fn test_spawn_rejected_after_cancel_is_not_counted() {
    let g = group();

    assert!(g.add_pending());
    assert!(g.cancel_all());
    assert!(!g.add_pending());
    assert!(!g.add_pending());

    // the one enrolled child is still accounted for
    assert!(!g.is_empty());
}

use crate::{
    task::RawTask,
    task_arc::TaskArc,
    tests::utils::{Canary, child},
};

#[cfg_attr(not(loom), test)]
pub fn test_task_arc_clone_and_drop() {
    let canary = Canary::new();
    let a = child(7, &canary);
    let b = a.clone();
    let c = b.clone();
    assert_eq!(canary.drops(), 0);

    drop(a);
    assert_eq!(canary.drops(), 0);
    assert_eq!(c.value(), 7);

    drop(b);
    assert_eq!(canary.drops(), 0);

    drop(c);
    assert_eq!(canary.drops(), 1);
}

#[cfg_attr(not(loom), test)]
pub fn test_task_arc_raw_round_trip() {
    let canary = Canary::new();
    let a = child(7, &canary);
    let raw = RawTask::into_raw(a.clone());
    assert_eq!(canary.drops(), 0);

    drop(a);
    // the converted reference still keeps the child alive
    assert_eq!(canary.drops(), 0);

    let b = unsafe { <crate::tests::utils::TestTask as RawTask>::from_raw(raw) };
    assert_eq!(b.value(), 7);
    drop(b);
    assert_eq!(canary.drops(), 1);
}

#[cfg_attr(not(loom), test)]
pub fn test_task_arc_as_raw_is_stable_across_clones() {
    let a = TaskArc::new(0u32);
    let b = a.clone();
    assert_eq!(RawTask::as_raw(&a), RawTask::as_raw(&b));
    assert_eq!(RawTask::as_raw(&a), RawTask::into_raw(b));
    // balance the reference surrendered by `into_raw`
    drop(unsafe { <TaskArc<u32> as RawTask>::from_raw(RawTask::as_raw(&a)) });
}

#[cfg_attr(not(loom), test)]
pub fn test_task_arc_alignment_leaves_tag_bits() {
    let a = TaskArc::new(0u8);
    let raw = RawTask::into_raw(a);
    assert_eq!(raw.as_ptr() as usize & 0b11, 0);
    drop(unsafe { <TaskArc<u8> as RawTask>::from_raw(raw) });
}

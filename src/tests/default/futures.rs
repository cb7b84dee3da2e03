use crate::{
    group::TaskGroup,
    next::WakerExecutor,
    tests::utils::{Arc, Canary, FutureTestExt, TestTask, child},
};

#[cfg_attr(not(loom), futures_test::test)]
pub async fn test_offer_wakes_parked() {
    let canary = Canary::new();
    let g = Arc::new(TaskGroup::<TestTask>::new());

    assert!(g.add_pending());
    let task = child(42, &canary);
    g.attach_child(task.clone());

    let offering = g.clone();
    async move {
        offering.offer(task, false, &WakerExecutor);
    }
    .run_in_background();

    match g.next().await {
        Some(Ok(task)) => assert_eq!(task.value(), 42),
        other => panic!("expected the completed child, got {other:?}"),
    }
    assert!(g.next().await.is_none());
    assert!(g.is_empty());
}

#[cfg_attr(not(loom), futures_test::test)]
pub async fn test_two_completions_race_one_consumer() {
    let canary = Canary::new();
    let g = Arc::new(TaskGroup::<TestTask>::new());

    let mut spawned = 0u32;
    for value in [1, 2] {
        assert!(g.add_pending());
        let task = child(value, &canary);
        g.attach_child(task.clone());
        spawned += value;
        let offering = g.clone();
        async move {
            offering.offer(task, false, &WakerExecutor);
        }
        .run_in_background();
    }

    let mut collected = 0u32;
    while let Some(done) = g.next().await {
        collected += done.ok().expect("no child failed").value();
    }
    // both completions arrive, in whichever order they raced into the group
    assert_eq!(collected, spawned);
    assert!(g.is_empty());
}

#[cfg_attr(not(loom), futures_test::test)]
pub async fn test_error_and_success_both_delivered() {
    let canary = Canary::new();
    let g = Arc::new(TaskGroup::<TestTask>::new());

    assert!(g.add_pending());
    assert!(g.add_pending());
    let failing = child(13, &canary);
    let succeeding = child(7, &canary);
    g.attach_child(failing.clone());
    g.attach_child(succeeding.clone());

    let offering = g.clone();
    async move {
        offering.offer(failing, true, &WakerExecutor);
        offering.offer(succeeding, false, &WakerExecutor);
    }
    .run_in_background();

    let mut failures = 0;
    let mut successes = 0;
    while let Some(done) = g.next().await {
        match done {
            Ok(task) => {
                assert_eq!(task.value(), 7);
                successes += 1;
            }
            Err(task) => {
                assert_eq!(task.value(), 13);
                failures += 1;
            }
        }
    }
    assert_eq!((failures, successes), (1, 1));
}

#[cfg_attr(not(loom), futures_test::test)]
pub async fn test_cancel_then_drain() {
    let canary = Canary::new();
    let g = Arc::new(TaskGroup::<TestTask>::new());

    assert!(g.add_pending());
    let task = child(1, &canary);
    g.attach_child(task.clone());

    assert!(g.cancel_all());
    assert!(!g.add_pending());

    let offering = g.clone();
    async move {
        // the cancelled child completes with an error and still offers
        let had_error = task.was_cancelled();
        offering.offer(task, had_error, &WakerExecutor);
    }
    .run_in_background();

    match g.next().await {
        Some(Err(task)) => assert!(task.was_cancelled()),
        other => panic!("expected the cancelled child's error, got {other:?}"),
    }
    assert!(g.next().await.is_none());
    assert!(g.is_empty());
}

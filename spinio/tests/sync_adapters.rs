use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use spinio::{CoopPool, HybridPool, Job, TaskRing, ThreadPool, submit_value, submit_wait};

#[test]
fn submit_wait_blocks_until_the_worker_ran_the_task() {
    let ring = Arc::new(TaskRing::with_capacity(8));
    let mut pool = ThreadPool::for_jobs(ring, 2);
    pool.start().expect("spawning worker threads");

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_c = hits.clone();
    let ok = submit_wait(&pool, move || {
        hits_c.fetch_add(1, Ordering::SeqCst);
    });

    // wait resolved: the computation has executed exactly once
    assert!(ok);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    pool.stop();
}

#[test]
fn submit_value_returns_the_value_from_a_worker_thread() {
    let ring = Arc::new(TaskRing::with_capacity(8));
    let mut pool = ThreadPool::for_jobs(ring, 1);
    pool.start().expect("spawning worker threads");

    let caller = thread::current().id();
    let value = submit_value(&pool, move || {
        assert_ne!(thread::current().id(), caller, "must run on a worker");
        String::from("computed elsewhere")
    });

    assert_eq!(value.as_deref(), Some("computed elsewhere"));
    pool.stop();
}

#[test]
fn adapters_work_over_the_cooperative_pool() {
    let ring = Arc::new(TaskRing::with_capacity(8));
    let mut pool = CoopPool::for_jobs(ring, 2);
    pool.start().expect("spawning the scheduler thread");

    assert_eq!(submit_value(&pool, || 6 * 7), Some(42));
    assert!(submit_wait(&pool, || {}));
    pool.stop();
}

#[test]
fn adapters_work_over_the_hybrid_pool() {
    let ring = Arc::new(TaskRing::with_capacity(8));
    let mut pool = HybridPool::for_jobs(ring, 2, 2);
    pool.start().expect("spawning worker threads");

    let values: Vec<_> = (0..10)
        .map(|i| submit_value(&pool, move || i * i))
        .collect();
    assert_eq!(
        values,
        (0..10).map(|i| Some(i * i)).collect::<Vec<_>>()
    );
    pool.stop();
}

#[test]
fn rejected_submission_fails_fast_instead_of_waiting_forever() {
    let ring = Arc::new(TaskRing::with_capacity(8));
    let pool: ThreadPool<Job> = ThreadPool::for_jobs(ring, 1);

    // never started: the adapter must not block on a task that will
    // never run
    assert!(!submit_wait(&pool, || {}));
    assert_eq!(submit_value(&pool, || 1), None);
}

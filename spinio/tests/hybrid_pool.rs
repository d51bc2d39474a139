use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use spinio::{Backoff, HybridPool, HybridPoolConfig, Job, TaskRing, job};

fn wait_for(counter: &AtomicUsize, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while counter.load(Ordering::SeqCst) < expected {
        assert!(Instant::now() < deadline, "tasks did not finish in time");
        thread::yield_now();
    }
}

#[test]
fn m_by_n_executes_every_accepted_task() {
    const TASKS: usize = 1_000;

    let ring = Arc::new(TaskRing::with_capacity(64));
    let mut pool = HybridPool::for_jobs(ring, 2, 4);
    pool.start().expect("spawning worker threads");

    let counter = Arc::new(AtomicUsize::new(0));
    let mut accepted = 0usize;
    while accepted < TASKS {
        let counter = counter.clone();
        if pool.submit(job!(counter.fetch_add(1, Ordering::SeqCst))) {
            accepted += 1;
        } else {
            thread::yield_now();
        }
    }

    wait_for(&counter, TASKS);
    pool.stop();
    assert_eq!(counter.load(Ordering::SeqCst), TASKS);
}

/// Per-thread policy that records every miss count it is fed
#[derive(Clone)]
struct RecordingBackoff {
    misses: Arc<Mutex<Vec<usize>>>,
}

impl Backoff for RecordingBackoff {
    fn apply(&mut self, miss_count: usize) {
        self.misses.lock().expect("test lock").push(miss_count);
        thread::yield_now();
    }
}

#[test]
fn idle_rounds_feed_a_monotonically_increasing_miss_count() {
    let misses = Arc::new(Mutex::new(Vec::new()));
    let ring: Arc<TaskRing<Job>> = Arc::new(TaskRing::with_capacity(8));

    let mut pool = HybridPool::with_backoff(
        ring,
        |job: Job| job(),
        HybridPoolConfig {
            threads: 1,
            tasks_per_thread: 2,
            ..HybridPoolConfig::default()
        },
        RecordingBackoff {
            misses: misses.clone(),
        },
    );
    pool.start().expect("spawning worker threads");

    // zero tasks submitted: every round is a miss
    let deadline = Instant::now() + Duration::from_secs(5);
    while misses.lock().expect("test lock").len() < 100 {
        assert!(Instant::now() < deadline, "backoff never invoked");
        thread::yield_now();
    }
    pool.stop();

    let recorded = misses.lock().expect("test lock");
    for window in recorded[..100].windows(2) {
        assert_eq!(
            window[1],
            window[0] + 1,
            "miss count must grow by one per idle round"
        );
    }
    assert_eq!(recorded[0], 1, "first idle round reports one miss");
}

#[test]
fn progress_resets_the_miss_count() {
    let misses = Arc::new(Mutex::new(Vec::new()));
    let ring: Arc<TaskRing<Job>> = Arc::new(TaskRing::with_capacity(8));

    let mut pool = HybridPool::with_backoff(
        ring,
        |job: Job| job(),
        HybridPoolConfig {
            threads: 1,
            tasks_per_thread: 1,
            ..HybridPoolConfig::default()
        },
        RecordingBackoff {
            misses: misses.clone(),
        },
    );
    pool.start().expect("spawning worker threads");

    // let the miss count climb
    let deadline = Instant::now() + Duration::from_secs(5);
    while misses.lock().expect("test lock").len() < 50 {
        assert!(Instant::now() < deadline, "backoff never invoked");
        thread::yield_now();
    }

    // one executed task resets the next idle streak to one
    let ran = Arc::new(AtomicUsize::new(0));
    loop {
        let ran = ran.clone();
        if pool.submit(job!(ran.fetch_add(1, Ordering::SeqCst))) {
            break;
        }
        thread::yield_now();
    }
    wait_for(&ran, 1);

    let watermark = misses.lock().expect("test lock").len();
    let deadline = Instant::now() + Duration::from_secs(5);
    while misses.lock().expect("test lock").len() < watermark + 10 {
        assert!(Instant::now() < deadline, "backoff stalled after progress");
        thread::yield_now();
    }
    pool.stop();

    let recorded = misses.lock().expect("test lock");
    assert!(
        recorded[watermark..].contains(&1),
        "miss count must restart at one after a productive round"
    );
}

#[test]
fn stop_is_idempotent_and_abandons_suspended_tasks() {
    let ring = Arc::new(TaskRing::with_capacity(4));
    let mut pool: HybridPool<Job> = HybridPool::for_jobs(ring.clone(), 2, 2);

    pool.stop();
    pool.start().expect("spawning worker threads");

    // leave work queued: stop must still return without draining
    assert!(pool.submit(job!(())));
    pool.stop();
    pool.stop();
}

#[test]
fn stopped_pool_rejects_submissions() {
    let ring = Arc::new(TaskRing::with_capacity(4));
    let mut pool = HybridPool::for_jobs(ring.clone(), 1, 1);
    pool.start().expect("spawning worker threads");
    pool.stop();

    assert!(!pool.submit(job!(())));
}

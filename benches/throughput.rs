//! Throughput benchmarks for the ring queue and the runtime policies

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use spinio::{HybridPool, RingQueue, TaskRing, ThreadPool};
use spinio_utils::submit_with_handle;

fn queue_push_pop(criterion: &mut Criterion) {
    let queue = RingQueue::with_capacity(1024);

    criterion.bench_function("queue-push-pop", |b| {
        b.iter(|| {
            queue.try_push(black_box(1usize)).ok();
            black_box(queue.try_pop().ok());
        })
    });
}

fn queue_contended(criterion: &mut Criterion) {
    criterion.bench_function("queue-spsc-1k", |b| {
        b.iter(|| {
            let queue = Arc::new(RingQueue::with_capacity(256));
            let producer = {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    let mut v = 0usize;
                    while v < 1_000 {
                        match queue.try_push(v) {
                            Ok(()) => v += 1,
                            Err(_) => std::thread::yield_now(),
                        }
                    }
                })
            };

            let mut seen = 0usize;
            while seen < 1_000 {
                if queue.try_pop().is_ok() {
                    seen += 1;
                } else {
                    std::thread::yield_now();
                }
            }
            producer.join().ok();
        })
    });
}

fn pool_roundtrip(criterion: &mut Criterion) {
    let ring: Arc<TaskRing<usize>> = Arc::new(TaskRing::with_capacity(1024));
    let executed = Arc::new(AtomicUsize::new(0));
    let executed_cb = executed.clone();
    let mut pool = ThreadPool::new(
        ring,
        move |n: usize| {
            black_box(n);
            executed_cb.fetch_add(1, Ordering::Relaxed);
        },
        4,
    );
    pool.start().expect("spawning worker threads");

    criterion.bench_function("thread-pool-100-tasks", |b| {
        b.iter(|| {
            let base = executed.load(Ordering::Relaxed);
            for i in 0..100usize {
                while !pool.submit(i) {
                    std::thread::yield_now();
                }
            }
            while executed.load(Ordering::Relaxed) < base + 100 {
                std::thread::yield_now();
            }
        })
    });

    pool.stop();
}

fn hybrid_roundtrip(criterion: &mut Criterion) {
    let ring: Arc<TaskRing<usize>> = Arc::new(TaskRing::with_capacity(1024));
    let executed = Arc::new(AtomicUsize::new(0));
    let executed_cb = executed.clone();
    let mut pool = HybridPool::new(
        ring,
        move |n: usize| {
            black_box(n);
            executed_cb.fetch_add(1, Ordering::Relaxed);
        },
        2,
        8,
    );
    pool.start().expect("spawning worker threads");

    criterion.bench_function("hybrid-pool-100-tasks", |b| {
        b.iter(|| {
            let base = executed.load(Ordering::Relaxed);
            for i in 0..100usize {
                while !pool.submit(i) {
                    std::thread::yield_now();
                }
            }
            while executed.load(Ordering::Relaxed) < base + 100 {
                std::thread::yield_now();
            }
        })
    });

    pool.stop();
}

fn handle_roundtrip(criterion: &mut Criterion) {
    let ring = Arc::new(TaskRing::with_capacity(64));
    let mut pool = ThreadPool::for_jobs(ring, 2);
    pool.start().expect("spawning worker threads");

    criterion.bench_function("handle-submit-recv", |b| {
        b.iter(|| {
            let handle = loop {
                if let Some(handle) = submit_with_handle(&pool, || black_box(21usize) * 2) {
                    break handle;
                }
                std::thread::yield_now();
            };
            black_box(handle.recv().expect("worker sends the value"));
        })
    });

    pool.stop();
}

criterion_group!(
    throughput,
    queue_push_pop,
    queue_contended,
    pool_roundtrip,
    hybrid_roundtrip,
    handle_roundtrip
);

criterion_main!(throughput);

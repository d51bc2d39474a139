//! M:N pool fed by several producer threads, with a custom backoff
//! so the idle-throttling transitions are visible in the logs
//! (`RUST_LOG=debug`)

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use spinio::{Backoff, DefaultBackoff, HybridPool, HybridPoolConfig, TaskRing};

/// Wraps [`DefaultBackoff`] to log each tier transition
#[derive(Clone)]
struct ChattyBackoff {
    inner: DefaultBackoff,
}

impl Backoff for ChattyBackoff {
    fn apply(&mut self, miss_count: usize) {
        if miss_count == self.inner.spin_limit {
            tracing::debug!("idle: leaving spin tier");
        } else if miss_count == self.inner.yield_limit {
            tracing::debug!("idle: entering sleep tier");
        }
        self.inner.apply(miss_count);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let ring: Arc<TaskRing<usize>> = Arc::new(TaskRing::with_capacity(256));
    let executed = Arc::new(AtomicUsize::new(0));

    let executed_cb = executed.clone();
    let mut pool = HybridPool::with_backoff(
        ring,
        move |n: usize| {
            // a tiny bit of work per payload
            std::hint::black_box(n.wrapping_mul(2_654_435_761));
            executed_cb.fetch_add(1, Ordering::Relaxed);
        },
        HybridPoolConfig {
            threads: 2,
            tasks_per_thread: 8,
            ..HybridPoolConfig::default()
        },
        ChattyBackoff {
            inner: DefaultBackoff::default(),
        },
    );
    pool.start()?;

    let pool = Arc::new(pool);
    let producers: Vec<_> = (0..3)
        .map(|p| {
            let pool = pool.clone();
            thread::spawn(move || {
                for i in 0..10_000usize {
                    while !pool.submit(p * 10_000 + i) {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer completes");
    }
    while executed.load(Ordering::Relaxed) < 30_000 {
        thread::yield_now();
    }
    tracing::info!("executed {} payloads", executed.load(Ordering::Relaxed));

    // leave the pool idle for a moment so the backoff tiers engage
    thread::sleep(Duration::from_millis(100));

    Arc::try_unwrap(pool)
        .map_err(|_| "producers still hold the pool")?
        .stop();
    Ok(())
}

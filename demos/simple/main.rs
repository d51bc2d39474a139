use std::sync::Arc;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use spinio::{TaskRing, ThreadPool, job};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let ring = Arc::new(TaskRing::with_capacity(128));
    let mut pool = ThreadPool::for_jobs(ring, 4);
    pool.start()?;

    let (tx, rx) = flume::unbounded();
    for i in 0..32u32 {
        loop {
            let tx = tx.clone();
            if pool.submit(job!(tx.send(i * i).ok())) {
                break;
            }
            std::thread::yield_now();
        }
    }
    drop(tx);

    let mut results: Vec<u32> = rx.into_iter().collect();
    results.sort_unstable();
    tracing::info!("squares from the pool: {results:?}");

    tracing::info!("in-flight at shutdown: {}", pool.size_approx());
    pool.stop();
    Ok(())
}

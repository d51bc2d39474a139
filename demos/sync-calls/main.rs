//! Call/return semantics over a fire-and-forget pool: the blocking
//! adapters from `spinio::sync` and the channel-backed handle from
//! `spinio-utils`

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use spinio::{CoopPool, TaskRing, submit_value, submit_wait};
use spinio_utils::submit_with_handle;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let ring = Arc::new(TaskRing::with_capacity(32));
    let mut pool = CoopPool::for_jobs(ring, 4);
    pool.start()?;

    if submit_wait(&pool, || tracing::info!("ran on the scheduler thread")) {
        tracing::info!("submit_wait resolved");
    }

    let answer = submit_value(&pool, || 6 * 7);
    tracing::info!("submit_value returned {answer:?}");

    // non-blocking variant: keep the handle, collect later
    let handle = submit_with_handle(&pool, || (1..=10u64).product::<u64>())
        .ok_or("pool rejected the submission")?;
    tracing::info!("10! = {:?}", handle.recv()?);

    pool.stop();
    Ok(())
}

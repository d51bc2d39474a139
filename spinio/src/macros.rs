/// Boxes a closure body into a [`crate::Job`] payload
///
/// ```
/// use spinio::{TaskRing, ThreadPool, job};
/// use std::sync::Arc;
///
/// let ring = Arc::new(TaskRing::with_capacity(8));
/// let mut pool = ThreadPool::for_jobs(ring, 1);
/// pool.start().unwrap();
/// pool.submit(job!(tracing::info!("hello from a worker")));
/// pool.stop();
/// ```
#[macro_export]
macro_rules! job {
    ($body:expr) => {
        Box::new(move || {
            $body;
        }) as $crate::Job
    };
}

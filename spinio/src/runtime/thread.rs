use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use derive_builder::Builder;

use crate::{
    container::TaskRing,
    runtime::{Job, Runtime, RuntimeError, ThreadConfig, spawn_worker},
};

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", default)]
pub struct ThreadPoolConfig {
    /// Number of OS worker threads created by `start`
    pub workers: usize,
    /// Upper bound on how long an idle worker blocks before
    /// re-checking the container, tolerating missed wake-ups from the
    /// non-blocking submit path
    pub wait_timeout: Duration,
    pub thread: ThreadConfig,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            wait_timeout: Duration::from_millis(1),
            thread: ThreadConfig::default(),
        }
    }
}

/// Preemptive thread-pool runtime.
///
/// N OS threads loop over the shared [`TaskRing`]: a successful pop
/// runs the task inline on that worker, a miss blocks on a wake
/// signal with a short timeout. `submit` forwards to the container
/// and, on success, wakes one idle worker. All waiting lives here;
/// the container itself never blocks.
pub struct ThreadPool<T: Send + 'static> {
    ring: Arc<TaskRing<T>>,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    running: Arc<AtomicBool>,
    wake_tx: flume::Sender<()>,
    wake_rx: flume::Receiver<()>,
    workers: Vec<JoinHandle<()>>,
    cfg: ThreadPoolConfig,
}

impl<T: Send + 'static> std::fmt::Debug for ThreadPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.cfg.workers)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Send + 'static> ThreadPool<T> {
    /// Creates an inert pool of `workers` threads executing every
    /// dequeued task through `callback`
    pub fn new(
        ring: Arc<TaskRing<T>>,
        callback: impl Fn(T) + Send + Sync + 'static,
        workers: usize,
    ) -> Self {
        Self::with_config(
            ring,
            callback,
            ThreadPoolConfig {
                workers,
                ..ThreadPoolConfig::default()
            },
        )
    }

    pub fn with_config(
        ring: Arc<TaskRing<T>>,
        callback: impl Fn(T) + Send + Sync + 'static,
        cfg: ThreadPoolConfig,
    ) -> Self {
        // one pending wakeup per worker is enough, extra signals are
        // redundant with the bounded wait
        let (wake_tx, wake_rx) = flume::bounded(cfg.workers.max(1));
        Self {
            ring,
            callback: Arc::new(callback),
            running: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
            workers: Vec::new(),
            cfg,
        }
    }

    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!(workers = self.cfg.workers, "starting thread pool");

        for i in 0..self.cfg.workers {
            let ring = self.ring.clone();
            let callback = self.callback.clone();
            let running = self.running.clone();
            let wake_rx = self.wake_rx.clone();
            let wait_timeout = self.cfg.wait_timeout;

            let spawned = spawn_worker(&self.cfg.thread, i, move || {
                worker_loop(ring, callback, running, wake_rx, wait_timeout)
            });
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    self.stop();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("stopping thread pool");

        for _ in 0..self.workers.len() {
            let _ = self.wake_tx.try_send(());
        }
        for handle in self.workers.drain(..) {
            handle.join().ok();
        }
    }

    pub fn submit(&self, task: T) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        let ok = self.ring.add(task);
        if ok {
            // wake one idle worker; a full signal queue means every
            // worker already has a wakeup pending
            let _ = self.wake_tx.try_send(());
        }
        ok
    }

    pub fn size_approx(&self) -> usize {
        self.ring.size_approx()
    }
}

impl ThreadPool<Job> {
    /// Pool whose payloads are boxed closures invoked directly
    pub fn for_jobs(ring: Arc<TaskRing<Job>>, workers: usize) -> Self {
        Self::new(ring, |job: Job| job(), workers)
    }
}

fn worker_loop<T: Send>(
    ring: Arc<TaskRing<T>>,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    running: Arc<AtomicBool>,
    wake_rx: flume::Receiver<()>,
    wait_timeout: Duration,
) {
    tracing::trace!("worker online");
    while running.load(Ordering::Acquire) {
        match ring.try_pop() {
            Some(task) => (callback)(task),
            None => {
                // bounded wait, not indefinite: a wake-up raced ahead
                // of the pop above may otherwise be missed forever
                let _ = wake_rx.recv_timeout(wait_timeout);
            }
        }
    }
    tracing::trace!("worker exiting");
}

impl<T: Send + 'static> Runtime<T> for ThreadPool<T> {
    fn start(&mut self) -> Result<(), RuntimeError> {
        ThreadPool::start(self)
    }

    fn stop(&mut self) {
        ThreadPool::stop(self)
    }

    fn submit(&self, task: T) -> bool {
        ThreadPool::submit(self, task)
    }

    fn size_approx(&self) -> usize {
        ThreadPool::size_approx(self)
    }
}

impl<T: Send + 'static> Drop for ThreadPool<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

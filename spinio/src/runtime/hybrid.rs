use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::JoinHandle,
};

use derive_builder::Builder;

use crate::{
    container::TaskRing,
    queue::{Queue, RingQueue},
    runtime::{
        Job, Runtime, RuntimeError, ThreadConfig,
        backoff::{Backoff, DefaultBackoff},
        spawn_worker,
    },
    task::{CoTask, yield_now},
};

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", default)]
pub struct HybridPoolConfig {
    /// Number of OS worker threads
    pub threads: usize,
    /// Cooperative consume tasks hosted per thread
    pub tasks_per_thread: usize,
    pub thread: ThreadConfig,
}

impl Default for HybridPoolConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            tasks_per_thread: 1,
            thread: ThreadConfig {
                name: "spinio-hybrid".into(),
                ..ThreadConfig::default()
            },
        }
    }
}

/// Hybrid M:N runtime: M OS threads, each hosting N cooperative
/// consume tasks over one shared container.
///
/// A consume task that pops successfully runs the callback and loops
/// immediately; only a miss yields. Each thread tracks whether any of
/// its tasks executed work during a full round; a progress-free round
/// increments a thread-local miss count fed to the [`Backoff`]
/// policy, and any progress resets it. Idle threads throttle through
/// the policy rather than blocking, trading latency for CPU usage
/// predictably.
///
/// This runtime owns no data and promises no fairness or ordering; it
/// only decides when to resume which task and how hard to poll when
/// idle. `stop` is best-effort: suspended consume-task frames are
/// dropped, not drained.
pub struct HybridPool<T, Q = RingQueue<T>, B = DefaultBackoff>
where
    T: Send + 'static,
    Q: Queue<T> + 'static,
    B: Backoff + Clone + Send + 'static,
{
    ring: Arc<TaskRing<T, Q>>,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    backoff: B,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    cfg: HybridPoolConfig,
}

impl<T, Q, B> std::fmt::Debug for HybridPool<T, Q, B>
where
    T: Send + 'static,
    Q: Queue<T> + 'static,
    B: Backoff + Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridPool")
            .field("threads", &self.cfg.threads)
            .field("tasks_per_thread", &self.cfg.tasks_per_thread)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Send + 'static> HybridPool<T> {
    /// M threads x N cooperative tasks with the default
    /// spin/yield/sleep backoff
    pub fn new(
        ring: Arc<TaskRing<T>>,
        callback: impl Fn(T) + Send + Sync + 'static,
        threads: usize,
        tasks_per_thread: usize,
    ) -> Self {
        Self::with_backoff(
            ring,
            callback,
            HybridPoolConfig {
                threads,
                tasks_per_thread,
                ..HybridPoolConfig::default()
            },
            DefaultBackoff::default(),
        )
    }
}

impl<T, Q, B> HybridPool<T, Q, B>
where
    T: Send + 'static,
    Q: Queue<T> + 'static,
    B: Backoff + Clone + Send + 'static,
{
    /// Injects both the queue implementation (through the container)
    /// and the backoff strategy. Every worker thread receives its own
    /// clone of `backoff`; policy state is never shared
    pub fn with_backoff(
        ring: Arc<TaskRing<T, Q>>,
        callback: impl Fn(T) + Send + Sync + 'static,
        cfg: HybridPoolConfig,
        backoff: B,
    ) -> Self {
        Self {
            ring,
            callback: Arc::new(callback),
            backoff,
            running: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
            cfg,
        }
    }

    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!(
            threads = self.cfg.threads,
            tasks_per_thread = self.cfg.tasks_per_thread,
            "starting hybrid pool"
        );

        for i in 0..self.cfg.threads {
            let ring = self.ring.clone();
            let callback = self.callback.clone();
            let running = self.running.clone();
            let tasks = self.cfg.tasks_per_thread;
            let backoff = self.backoff.clone();

            let spawned = spawn_worker(&self.cfg.thread, i, move || {
                thread_main(ring, callback, running, tasks, backoff)
            });
            match spawned {
                Ok(handle) => self.threads.push(handle),
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
        tracing::debug!("stopping hybrid pool");
        for handle in self.threads.drain(..) {
            handle.join().ok();
        }
    }

    pub fn submit(&self, task: T) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        self.ring.add(task)
    }

    pub fn size_approx(&self) -> usize {
        self.ring.size_approx()
    }
}

impl HybridPool<Job> {
    /// Pool whose payloads are boxed closures invoked directly
    pub fn for_jobs(ring: Arc<TaskRing<Job>>, threads: usize, tasks_per_thread: usize) -> Self {
        Self::new(ring, |job: Job| job(), threads, tasks_per_thread)
    }
}

/// One worker thread: builds its cooperative consume tasks, then
/// round-robins them, backing off on progress-free rounds.
///
/// Progress is detected through a shared executed-counter rather than
/// the poll results: a consume loop returns `Pending` both when it
/// ran tasks and when it merely yielded on an empty container
fn thread_main<T, Q, B>(
    ring: Arc<TaskRing<T, Q>>,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    running: Arc<AtomicBool>,
    count: usize,
    mut backoff: B,
) where
    T: Send + 'static,
    Q: Queue<T> + 'static,
    B: Backoff,
{
    let executed = Arc::new(AtomicUsize::new(0));

    let mut tasks: Vec<CoTask> = (0..count)
        .map(|_| {
            let ring = ring.clone();
            let callback = callback.clone();
            let running = running.clone();
            let executed = executed.clone();
            CoTask::new(Box::pin(async move {
                while running.load(Ordering::Relaxed) {
                    match ring.try_pop() {
                        Some(task) => {
                            (callback)(task);
                            executed.fetch_add(1, Ordering::Relaxed);
                            // no forced yield after progress, drain
                            // while the container is hot
                        }
                        None => yield_now().await,
                    }
                }
            }))
        })
        .collect();

    let mut miss_count: usize = 0;
    while running.load(Ordering::Acquire) {
        let before = executed.load(Ordering::Relaxed);
        resume_round(&mut tasks);

        if executed.load(Ordering::Relaxed) == before {
            miss_count += 1;
            backoff.apply(miss_count);
        } else {
            miss_count = 0;
        }
    }
    // suspended frames are torn down here, mid-flight consume loops
    // are abandoned rather than drained
    tracing::trace!("hybrid worker exiting");
}

#[cfg(not(feature = "fairness"))]
fn resume_round(tasks: &mut [CoTask]) {
    for task in tasks.iter_mut() {
        let _ = task.resume();
    }
}

/// Randomizes which consume task is resumed first each round so one
/// task cannot monopolize a hot container
#[cfg(feature = "fairness")]
fn resume_round(tasks: &mut [CoTask]) {
    use rand::Rng;

    if tasks.is_empty() {
        return;
    }
    let len = tasks.len();
    let offset = rand::rng().random_range(0..len);
    for i in 0..len {
        let _ = tasks[(offset + i) % len].resume();
    }
}

impl<T, Q, B> Runtime<T> for HybridPool<T, Q, B>
where
    T: Send + 'static,
    Q: Queue<T> + 'static,
    B: Backoff + Clone + Send + 'static,
{
    fn start(&mut self) -> Result<(), RuntimeError> {
        HybridPool::start(self)
    }

    fn stop(&mut self) {
        HybridPool::stop(self)
    }

    fn submit(&self, task: T) -> bool {
        HybridPool::submit(self, task)
    }

    fn size_approx(&self) -> usize {
        HybridPool::size_approx(self)
    }
}

impl<T, Q, B> Drop for HybridPool<T, Q, B>
where
    T: Send + 'static,
    Q: Queue<T> + 'static,
    B: Backoff + Clone + Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

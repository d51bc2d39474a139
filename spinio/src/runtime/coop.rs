use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use derive_builder::Builder;

use crate::{
    container::TaskRing,
    runtime::{Job, Runtime, RuntimeError, ThreadConfig, spawn_worker},
    task::{CoTask, yield_now},
};

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", default)]
pub struct CoopPoolConfig {
    /// Number of cooperative consume tasks hosted on the single
    /// scheduler thread
    pub tasks: usize,
    pub thread: ThreadConfig,
}

impl Default for CoopPoolConfig {
    fn default() -> Self {
        Self {
            tasks: 1,
            thread: ThreadConfig {
                name: "spinio-coop".into(),
                ..ThreadConfig::default()
            },
        }
    }
}

/// Cooperative single-thread runtime.
///
/// Exactly one OS thread runs N cooperatively-scheduled consume
/// loops in round-robin order. Each loop iteration pops at most one
/// task, runs it inline, then explicitly yields regardless of the
/// outcome; after a full round the scheduler cedes its OS time
/// slice. No blocking wait primitive is used anywhere and every
/// suspension point is a visible [`yield_now`].
///
/// Suited to workloads dominated by waiting on non-blocking sources:
/// a long-running task starves its sibling tasks on the same thread.
pub struct CoopPool<T: Send + 'static> {
    ring: Arc<TaskRing<T>>,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    running: Arc<AtomicBool>,
    scheduler: Option<JoinHandle<()>>,
    cfg: CoopPoolConfig,
}

impl<T: Send + 'static> std::fmt::Debug for CoopPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoopPool")
            .field("tasks", &self.cfg.tasks)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Send + 'static> CoopPool<T> {
    pub fn new(
        ring: Arc<TaskRing<T>>,
        callback: impl Fn(T) + Send + Sync + 'static,
        tasks: usize,
    ) -> Self {
        Self::with_config(
            ring,
            callback,
            CoopPoolConfig {
                tasks,
                ..CoopPoolConfig::default()
            },
        )
    }

    pub fn with_config(
        ring: Arc<TaskRing<T>>,
        callback: impl Fn(T) + Send + Sync + 'static,
        cfg: CoopPoolConfig,
    ) -> Self {
        Self {
            ring,
            callback: Arc::new(callback),
            running: Arc::new(AtomicBool::new(false)),
            scheduler: None,
            cfg,
        }
    }

    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!(tasks = self.cfg.tasks, "starting cooperative pool");

        let ring = self.ring.clone();
        let callback = self.callback.clone();
        let running = self.running.clone();
        let tasks = self.cfg.tasks;

        let spawned = spawn_worker(&self.cfg.thread, 0, move || {
            scheduler_loop(ring, callback, running, tasks)
        });
        match spawned {
            Ok(handle) => {
                self.scheduler = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("stopping cooperative pool");
        if let Some(handle) = self.scheduler.take() {
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

impl CoopPool<Job> {
    /// Pool whose payloads are boxed closures invoked directly
    pub fn for_jobs(ring: Arc<TaskRing<Job>>, tasks: usize) -> Self {
        Self::new(ring, |job: Job| job(), tasks)
    }
}

/// Round-robin scheduler hosting every cooperative consume loop on
/// the calling thread. Consume loops still suspended when the
/// running flag drops are abandoned: their frames are dropped with
/// the task vector, never drained
fn scheduler_loop<T: Send + 'static>(
    ring: Arc<TaskRing<T>>,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    running: Arc<AtomicBool>,
    count: usize,
) {
    let mut tasks: Vec<CoTask> = (0..count)
        .map(|_| {
            let ring = ring.clone();
            let callback = callback.clone();
            let running = running.clone();
            CoTask::new(Box::pin(async move {
                while running.load(Ordering::Relaxed) {
                    if let Some(task) = ring.try_pop() {
                        (callback)(task);
                    }
                    // suspend every iteration, hit or miss
                    yield_now().await;
                }
            }))
        })
        .collect();

    while running.load(Ordering::Acquire) {
        for task in tasks.iter_mut() {
            let _ = task.resume();
        }
        std::thread::yield_now();
    }
    tracing::trace!("scheduler exiting");
}

impl<T: Send + 'static> Runtime<T> for CoopPool<T> {
    fn start(&mut self) -> Result<(), RuntimeError> {
        CoopPool::start(self)
    }

    fn stop(&mut self) {
        CoopPool::stop(self)
    }

    fn submit(&self, task: T) -> bool {
        CoopPool::submit(self, task)
    }

    fn size_approx(&self) -> usize {
        CoopPool::size_approx(self)
    }
}

impl<T: Send + 'static> Drop for CoopPool<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Synchronous-call adapters bridging the fire-and-forget runtimes to
//! call/return semantics.
//!
//! Both adapters are one-shot: created per call, resolved by exactly
//! one `wait`/`get`, then discarded. The submitting stack frame keeps
//! a handle for the whole wait, so no dangling reference crosses the
//! runtime boundary.
//!
//! Caller obligation: `stop` does not drain the container, so a task
//! accepted by `submit` and then never executed leaves its adapter
//! waiting forever. Do not stop a runtime while accepted synchronous
//! submissions are outstanding.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::runtime::{Job, Runtime};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|_| panic!("sync adapter lock poisoned"))
}

struct BlockingInner {
    job: Mutex<Option<Job>>,
    done: Mutex<bool>,
    cv: Condvar,
}

/// Wraps a no-argument, no-return computation so the submitting
/// caller can block until a runtime has executed it.
///
/// Cloning is cheap and shares the same one-shot state: clone once
/// into the submitted payload, keep the original to [`wait`] on.
///
/// [`wait`]: BlockingTask::wait
#[derive(Clone)]
pub struct BlockingTask {
    inner: Arc<BlockingInner>,
}

impl std::fmt::Debug for BlockingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingTask")
            .field("done", &*lock(&self.inner.done))
            .finish()
    }
}

impl BlockingTask {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(BlockingInner {
                job: Mutex::new(Some(Box::new(f))),
                done: Mutex::new(false),
                cv: Condvar::new(),
            }),
        }
    }

    /// Runtime execution entry point: runs the wrapped computation,
    /// flags completion and signals the waiter. A second invocation
    /// is a no-op for the computation itself
    pub fn run(&self) {
        let job = lock(&self.inner.job).take();
        if let Some(job) = job {
            job();
        }
        *lock(&self.inner.done) = true;
        self.inner.cv.notify_all();
    }

    /// Blocks the caller until [`run`] has completed
    ///
    /// [`run`]: BlockingTask::run
    pub fn wait(&self) {
        let mut done = lock(&self.inner.done);
        while !*done {
            done = self
                .inner
                .cv
                .wait(done)
                .unwrap_or_else(|_| panic!("sync adapter lock poisoned"));
        }
    }
}

struct ResultInner<R> {
    job: Mutex<Option<Box<dyn FnOnce() -> R + Send>>>,
    slot: Mutex<Option<R>>,
    cv: Condvar,
}

/// Like [`BlockingTask`] but captures the computation's return value,
/// handed back by [`get`].
///
/// [`get`]: ResultTask::get
pub struct ResultTask<R> {
    inner: Arc<ResultInner<R>>,
}

impl<R> Clone for ResultTask<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R> std::fmt::Debug for ResultTask<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultTask")
            .field("done", &lock(&self.inner.slot).is_some())
            .finish()
    }
}

impl<R: Send + 'static> ResultTask<R> {
    pub fn new(f: impl FnOnce() -> R + Send + 'static) -> Self {
        Self {
            inner: Arc::new(ResultInner {
                job: Mutex::new(Some(Box::new(f))),
                slot: Mutex::new(None),
                cv: Condvar::new(),
            }),
        }
    }

    /// Runtime execution entry point: runs the wrapped computation
    /// once, stores its value under the lock, signals the waiter
    pub fn run(&self) {
        let job = lock(&self.inner.job).take();
        if let Some(job) = job {
            let value = job();
            *lock(&self.inner.slot) = Some(value);
            self.inner.cv.notify_all();
        }
    }

    /// Blocks until [`run`] stored the value, then returns it.
    /// Consumes the handle: the adapter is single-use
    ///
    /// [`run`]: ResultTask::run
    pub fn get(self) -> R {
        let mut slot = lock(&self.inner.slot);
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            slot = self
                .inner
                .cv
                .wait(slot)
                .unwrap_or_else(|_| panic!("sync adapter lock poisoned"));
        }
    }
}

/// Submits `f` and blocks until a worker has executed it. Returns
/// `false` without waiting when the runtime rejects the submission
/// (container full, producer race lost, or runtime stopped)
pub fn submit_wait<P>(pool: &P, f: impl FnOnce() + Send + 'static) -> bool
where
    P: Runtime<Job> + ?Sized,
{
    let task = BlockingTask::new(f);
    let runner = task.clone();
    if !pool.submit(Box::new(move || runner.run())) {
        return false;
    }
    task.wait();
    true
}

/// Submits `f` and blocks until a worker has produced its value.
/// `None` means the submission was rejected and `f` never ran
pub fn submit_value<P, R>(pool: &P, f: impl FnOnce() -> R + Send + 'static) -> Option<R>
where
    P: Runtime<Job> + ?Sized,
    R: Send + 'static,
{
    let task = ResultTask::new(f);
    let runner = task.clone();
    if !pool.submit(Box::new(move || runner.run())) {
        return None;
    }
    Some(task.get())
}

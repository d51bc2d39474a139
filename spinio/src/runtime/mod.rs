//! Runtime layer: the scheduling policies that own all waiting and
//! backoff behavior.
//!
//! The [`crate::TaskRing`] container below this layer never blocks;
//! everything that waits, yields or sleeps lives here. The three
//! policies are interchangeable behind the same container contract:
//! [`thread::ThreadPool`] (preemptive OS threads),
//! [`coop::CoopPool`] (one thread, cooperative tasks) and
//! [`hybrid::HybridPool`] (M threads x N cooperative tasks with a
//! pluggable backoff).

pub mod backoff;
pub mod coop;
pub mod hybrid;
pub mod thread;

use std::thread::JoinHandle;

use derive_builder::Builder;

/// Fire-and-forget unit of work, the common payload type when tasks
/// are plain closures
pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("worker thread spawn failure {0}")]
    Spawn(#[from] std::io::Error),
}

/// Common surface of the three scheduling policies.
///
/// Lifecycle: constructed inert, `start` spins up execution contexts,
/// `stop` signals shutdown and joins them. Both are idempotent and
/// `stop` is safe to call before `start` or from any non-worker
/// thread. Tasks still queued when `stop` is called are not
/// guaranteed to run.
pub trait Runtime<T> {
    fn start(&mut self) -> Result<(), RuntimeError>;

    fn stop(&mut self);

    /// Forwards to the container's `add`. Returns `false` when the
    /// container is saturated, when a producer race was lost, or when
    /// the runtime is not running; the caller decides whether to
    /// retry or shed
    fn submit(&self, task: T) -> bool;

    /// In-flight task count of the underlying container, approximate
    fn size_approx(&self) -> usize;
}

/// OS-thread knobs shared by every policy that spawns threads: a base
/// thread name, an optional stack size and optional per-worker core
/// pinning (worker `i` pins to `core_ids[i]` when present)
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", default)]
pub struct ThreadConfig {
    pub name: String,
    pub stack_size: Option<usize>,
    pub core_ids: Vec<usize>,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            name: "spinio-worker".into(),
            stack_size: None,
            core_ids: Vec::new(),
        }
    }
}

/// A panic escaping a task callback is fatal: task callbacks are
/// assumed not to panic across the runtime boundary, and a silently
/// dead worker would be worse than a loud stop
struct AbortOnPanic;

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("panic escaped a task callback, aborting");
            std::process::abort();
        }
    }
}

pub(crate) fn spawn_worker<F>(
    cfg: &ThreadConfig,
    index: usize,
    f: F,
) -> Result<JoinHandle<()>, RuntimeError>
where
    F: FnOnce() + Send + 'static,
{
    let mut builder = std::thread::Builder::new().name(format!("{}-{index}", cfg.name));
    if let Some(size) = cfg.stack_size {
        builder = builder.stack_size(size);
    }

    let core = cfg.core_ids.get(index).copied();
    let handle = builder.spawn(move || {
        let _abort_guard = AbortOnPanic;
        if let Some(id) = core {
            core_affinity::set_for_current(core_affinity::CoreId { id });
        }
        f()
    })?;
    Ok(handle)
}

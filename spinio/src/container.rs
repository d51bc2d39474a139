use std::marker::PhantomData;

use crate::queue::{Queue, RingQueue};

/// Non-blocking task container: the only shared mutable resource
/// between producers and the runtime policies.
///
/// `TaskRing` is a thin wrapper over a lock-free [`Queue`] and carries
/// zero waiting or scheduling logic. It never blocks, never sleeps and
/// never retries internally: a `Busy` outcome from the queue surfaces
/// as a failed `add`/`try_pop`, leaving the retry/backoff decision to
/// the runtime layer. Safe for any mixture of OS threads and
/// cooperative tasks to use concurrently.
///
/// The container must outlive every runtime borrowing it; runtimes
/// hold it behind an `Arc` cloned only at construction, never on the
/// hot path.
pub struct TaskRing<T, Q = RingQueue<T>>
where
    Q: Queue<T>,
{
    queue: Q,
    marker: PhantomData<fn(T) -> T>,
}

impl<T, Q: Queue<T>> std::fmt::Debug for TaskRing<T, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRing")
            .field("capacity", &self.queue.capacity())
            .field("size_approx", &self.queue.size_approx())
            .finish()
    }
}

impl<T: Send> TaskRing<T> {
    /// Creates a container backed by a [`RingQueue`] with a hard
    /// capacity bound on unconsumed tasks
    pub fn with_capacity(capacity: usize) -> Self {
        Self::over_queue(RingQueue::with_capacity(capacity))
    }
}

impl<T, Q: Queue<T>> TaskRing<T, Q> {
    /// Wraps an externally constructed queue implementation
    pub fn over_queue(queue: Q) -> Self {
        Self {
            queue,
            marker: PhantomData,
        }
    }

    /// Attempts to enqueue a task. Returns `true` iff the push
    /// succeeded; a full queue and a lost producer race both report
    /// `false` and the caller decides whether to retry or shed
    pub fn add(&self, task: T) -> bool {
        self.queue.try_push(task).is_ok()
    }

    /// Attempts to dequeue a task. `None` covers both an empty queue
    /// and a lost consumer race
    pub fn try_pop(&self) -> Option<T> {
        self.queue.try_pop().ok()
    }

    /// In-flight task count, approximate and for monitoring only
    pub fn size_approx(&self) -> usize {
        self.queue.size_approx()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Approximate emptiness hint, not a substitute for
    /// [`Self::try_pop`]
    pub fn is_empty_approx(&self) -> bool {
        self.queue.size_approx() == 0
    }
}

//! spinio is a layered task-execution runtime: a bounded lock-free
//! MPMC ring queue feeding interchangeable scheduling back-ends.
//!
//! The layering is strict by design. [`RingQueue`] and the
//! [`TaskRing`] container on top of it are purely non-blocking: no
//! waiting, no retries, no scheduling. All policy lives in the
//! runtime layer, which comes in three interchangeable flavors over
//! the same container: [`ThreadPool`] (preemptive OS threads),
//! [`CoopPool`] (one thread running cooperative tasks) and
//! [`HybridPool`] (M threads x N cooperative tasks with a pluggable
//! [`Backoff`]). The [`sync`] adapters bridge fire-and-forget
//! submission back to call/return semantics.

pub mod container;
pub mod queue;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod macros;

pub use container::TaskRing;
pub use queue::{Queue, RingQueue, TryPopError, TryPushError};
pub use runtime::{
    Job, Runtime, RuntimeError, ThreadConfig,
    backoff::{Backoff, DefaultBackoff},
    coop::{CoopPool, CoopPoolConfig},
    hybrid::{HybridPool, HybridPoolConfig},
    thread::{ThreadPool, ThreadPoolConfig},
};
pub use sync::{BlockingTask, ResultTask, submit_value, submit_wait};
pub use task::{CoTask, yield_now};

pub(crate) mod waker;

use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
};

use waker::{CoWaker, TaskHeader};

/// A cooperatively-scheduled task: a pinned future driven one poll at
/// a time by an external scheduler loop.
///
/// There is no hidden preemption anywhere in this type. A `CoTask`
/// makes progress only when its scheduler calls [`CoTask::resume`],
/// and suspends only where the future itself awaits (for the consume
/// loops of the runtime policies, an explicit [`yield_now`]).
pub struct CoTask {
    future: Pin<Box<dyn Future<Output = ()> + Send>>,
    header: Arc<TaskHeader>,
    waker: Waker,
    done: bool,
}

impl Debug for CoTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoTask")
            .field("done", &self.done)
            .field("parked", &self.header.is_parked())
            .finish()
    }
}

impl CoTask {
    pub fn new(future: Pin<Box<dyn Future<Output = ()> + Send>>) -> Self {
        let header = Arc::new(TaskHeader::default());
        let waker = CoWaker::waker(&header);

        Self {
            future,
            header,
            waker,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Resumes the task for one poll.
    ///
    /// A task that suspended without arranging a wake-up stays parked
    /// and is skipped until its waker fires; a task that woke itself
    /// before suspending (the `yield_now` pattern) is polled again on
    /// the next round
    pub fn resume(&mut self) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        if self.header.is_parked() {
            return Poll::Pending;
        }

        self.header.park();
        let mut cx = Context::from_waker(&self.waker);
        match self.future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                self.done = true;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Explicit cooperative suspension point: wakes itself, then yields
/// control back to the scheduler exactly once
pub async fn yield_now() {
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            if !self.0 {
                self.0 = true;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            Poll::Ready(())
        }
    }

    YieldOnce(false).await
}

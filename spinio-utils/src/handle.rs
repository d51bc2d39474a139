use spinio::{Job, Runtime};

#[derive(thiserror::Error, Debug)]
pub enum HandleError {
    /// The worker dropped the reply channel without sending, which
    /// can only happen when the runtime was stopped before the task
    /// ran or the task payload was discarded
    #[error("task result channel closed {0}")]
    ChannelClosed(#[from] flume::RecvError),
}

type Result<T> = std::result::Result<T, HandleError>;

/// Receiving side of a submitted computation's result.
///
/// Unlike [`spinio::ResultTask`], the submitter is free to carry the
/// handle around, poll it with [`try_recv`] or block on [`recv`]
/// later; the worker never blocks on the hand-off.
///
/// [`recv`]: TaskHandle::recv
/// [`try_recv`]: TaskHandle::try_recv
pub struct TaskHandle<R> {
    receiver: flume::Receiver<R>,
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").finish()
    }
}

impl<R> TaskHandle<R> {
    /// Blocks until the worker has produced the value
    pub fn recv(self) -> Result<R> {
        Ok(self.receiver.recv()?)
    }

    /// Non-blocking check for the value
    pub fn try_recv(&self) -> Option<R> {
        self.receiver.try_recv().ok()
    }

    pub fn receiver(self) -> flume::Receiver<R> {
        self.receiver
    }
}

/// Submits `f` to any job-payload runtime and returns a handle to its
/// eventual result. `None` means the submission was rejected and `f`
/// will never run
pub fn submit_with_handle<P, R>(
    pool: &P,
    f: impl FnOnce() -> R + Send + 'static,
) -> Option<TaskHandle<R>>
where
    P: Runtime<Job> + ?Sized,
    R: Send + 'static,
{
    let (tx, rx) = flume::bounded(1);

    let accepted = pool.submit(Box::new(move || {
        let value = f();
        tx.send(value)
            .inspect_err(|_| tracing::debug!("task handle dropped before completion"))
            .ok();
    }));

    if accepted {
        Some(TaskHandle { receiver: rx })
    } else {
        None
    }
}

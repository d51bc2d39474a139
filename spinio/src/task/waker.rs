use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{RawWaker, RawWakerVTable, Waker},
};

/// Shared state between a [`crate::task::CoTask`] and its waker.
///
/// A parked task is skipped by the scheduler round until something
/// wakes it. [`crate::task::yield_now`] wakes before suspending, so a
/// yielding consume loop is re-polled on the very next round
#[derive(Debug, Default)]
pub(crate) struct TaskHeader {
    parked: AtomicBool,
}

impl TaskHeader {
    #[inline]
    pub(crate) fn park(&self) {
        self.parked.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn unpark(&self) {
        self.parked.store(false, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_parked(&self) -> bool {
        self.parked.load(Ordering::Acquire)
    }
}

pub(crate) struct CoWaker;

impl CoWaker {
    const VTABLE: RawWakerVTable =
        RawWakerVTable::new(Self::clone, Self::wake, Self::wake_by_ref, Self::drop);

    #[inline]
    unsafe fn clone(raw: *const ()) -> RawWaker {
        let header = unsafe { Arc::from_raw(raw as *const TaskHeader) };
        std::mem::forget(header.clone());
        RawWaker::new(Arc::into_raw(header) as *const (), &Self::VTABLE)
    }

    #[inline]
    unsafe fn wake(raw: *const ()) {
        let header = unsafe { Arc::from_raw(raw as *const TaskHeader) };
        header.unpark();
    }

    #[inline]
    unsafe fn wake_by_ref(raw: *const ()) {
        unsafe { &*(raw as *const TaskHeader) }.unpark();
    }

    #[inline]
    unsafe fn drop(raw: *const ()) {
        drop(unsafe { Arc::from_raw(raw as *const TaskHeader) });
    }

    /// Builds a [`Waker`] holding its own reference to `header`
    pub(crate) fn waker(header: &Arc<TaskHeader>) -> Waker {
        let raw = RawWaker::new(Arc::into_raw(header.clone()) as *const (), &Self::VTABLE);
        // Safety: the vtable above upholds the RawWaker contract, each
        // raw pointer is a strong Arc reference accounted for by
        // clone/drop
        unsafe { Waker::from_raw(raw) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_unparks_the_header() {
        let header = Arc::new(TaskHeader::default());
        let waker = CoWaker::waker(&header);

        header.park();
        assert!(header.is_parked());

        waker.wake_by_ref();
        assert!(!header.is_parked());

        header.park();
        waker.wake();
        assert!(!header.is_parked());
    }

    #[test]
    fn cloned_wakers_share_the_header() {
        let header = Arc::new(TaskHeader::default());
        let waker = CoWaker::waker(&header);
        let cloned = waker.clone();
        drop(waker);

        header.park();
        cloned.wake();
        assert!(!header.is_parked());
    }
}

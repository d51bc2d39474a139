use std::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Failed [`RingQueue::try_push`] outcome, handing the rejected
/// item back to the caller
#[derive(thiserror::Error)]
pub enum TryPushError<T> {
    /// The queue is at capacity. Steady-state condition: retrying
    /// without an intervening pop will fail again
    #[error("queue full")]
    Full(T),
    /// Lost a race with another producer. Transient and always
    /// retry-safe
    #[error("queue busy")]
    Busy(T),
}

impl<T> TryPushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryPushError::Full(item) | TryPushError::Busy(item) => item,
        }
    }
}

impl<T> std::fmt::Debug for TryPushError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryPushError::Full(_) => write!(f, "Full(..)"),
            TryPushError::Busy(_) => write!(f, "Busy(..)"),
        }
    }
}

/// Failed [`RingQueue::try_pop`] outcome
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPopError {
    /// Nothing to consume. Steady-state condition, not an error
    #[error("queue empty")]
    Empty,
    /// Lost a race with another consumer. Transient and always
    /// retry-safe
    #[error("queue busy")]
    Busy,
}

/// Capability bound for anything that can stand in for the lock-free
/// ring, allowing the runtimes to be injected with alternate queue
/// implementations
pub trait Queue<T>: Send + Sync {
    fn try_push(&self, item: T) -> Result<(), TryPushError<T>>;
    fn try_pop(&self) -> Result<T, TryPopError>;
    fn size_approx(&self) -> usize;
    fn capacity(&self) -> usize;
}

struct Slot<T> {
    /// Encodes the slot's ownership state. Equal to the producer's
    /// tail position when the slot is ready for a write, tail + 1
    /// once a value is in place for the consumer, and head + capacity
    /// after consumption, re-arming the slot for the next lap. The
    /// acquire/release pairing on this counter is the only
    /// producer/consumer synchronization for the slot
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded lock-free MPMC ring queue.
///
/// Fixed capacity, per-slot sequence counters, monotonically
/// increasing head/tail cursors (wrapped only via modulo indexing).
/// All operations are non-blocking: contention surfaces as
/// [`TryPushError::Busy`] / [`TryPopError::Busy`] rather than
/// spinning or sleeping internally, leaving retry policy entirely
/// to the caller.
pub struct RingQueue<T> {
    head: AtomicUsize,
    tail: AtomicUsize,
    slots: Box<[Slot<T>]>,
}

unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}

impl<T> std::fmt::Debug for RingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingQueue")
            .field("capacity", &self.slots.len())
            .field("size_approx", &self.size_approx())
            .finish()
    }
}

impl<T> RingQueue<T> {
    /// Creates a queue with room for `capacity` in-flight items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "RingQueue capacity must be non-zero");

        let slots = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            slots,
        }
    }

    /// Attempts to enqueue `item` without blocking
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        // fast full check (hint only, the slot sequence is authoritative)
        if tail.wrapping_sub(head) >= self.slots.len() {
            return Err(TryPushError::Full(item));
        }

        let slot = &self.slots[tail % self.slots.len()];
        let seq = slot.sequence.load(Ordering::Acquire);
        let diff = seq.wrapping_sub(tail) as isize;

        if diff < 0 {
            // slot still owned by a pending consume from an earlier lap
            return Err(TryPushError::Full(item));
        }
        if diff > 0 {
            // another producer advanced past this position already
            return Err(TryPushError::Busy(item));
        }

        if self
            .tail
            .compare_exchange(tail, tail.wrapping_add(1), Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return Err(TryPushError::Busy(item));
        }

        // the CAS claimed this position exclusively
        unsafe { (*slot.value.get()).write(item) };
        slot.sequence.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Attempts to dequeue an item without blocking
    pub fn try_pop(&self) -> Result<T, TryPopError> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head == tail {
            return Err(TryPopError::Empty);
        }

        let slot = &self.slots[head % self.slots.len()];
        let seq = slot.sequence.load(Ordering::Acquire);

        if seq != head.wrapping_add(1) {
            // a producer claimed the position but has not published the
            // payload yet, unless the cursors caught up in the meantime
            if self.head.load(Ordering::Relaxed) == self.tail.load(Ordering::Relaxed) {
                return Err(TryPopError::Empty);
            }
            return Err(TryPopError::Busy);
        }

        if self
            .head
            .compare_exchange(head, head.wrapping_add(1), Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return Err(TryPopError::Busy);
        }

        let item = unsafe { (*slot.value.get()).assume_init_read() };
        // re-arm the slot for the producer of the next lap
        slot.sequence
            .store(head.wrapping_add(self.slots.len()), Ordering::Release);
        Ok(item)
    }

    /// Number of in-flight items. Approximate: may be stale the moment
    /// it returns, monitoring only
    pub fn size_approx(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Remaining room. Approximate, monitoring only
    pub fn available_approx(&self) -> usize {
        self.slots.len().saturating_sub(self.size_approx())
    }

    /// Whether the queue is possibly empty. Not a substitute for
    /// checking the result of [`Self::try_pop`]
    pub fn is_empty_approx(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head == tail
    }

    /// Whether the queue is possibly full. Not a substitute for
    /// checking the result of [`Self::try_push`]
    pub fn is_full_approx(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) >= self.slots.len()
    }
}

impl<T: Send> Queue<T> for RingQueue<T> {
    fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        RingQueue::try_push(self, item)
    }

    fn try_pop(&self) -> Result<T, TryPopError> {
        RingQueue::try_pop(self)
    }

    fn size_approx(&self) -> usize {
        RingQueue::size_approx(self)
    }

    fn capacity(&self) -> usize {
        RingQueue::capacity(self)
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        // exclusive access here, Busy cannot occur
        while self.try_pop().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_fresh_queue_is_empty() {
        let q: RingQueue<u32> = RingQueue::with_capacity(8);
        assert_eq!(q.try_pop(), Err(TryPopError::Empty));
        assert!(q.is_empty_approx());
        assert_eq!(q.size_approx(), 0);
    }

    #[test]
    fn capacity_bound_is_hard() {
        let q = RingQueue::with_capacity(4);
        for i in 0..4 {
            assert!(q.try_push(i).is_ok());
        }
        assert!(matches!(q.try_push(99), Err(TryPushError::Full(99))));
        assert!(q.is_full_approx());
        assert_eq!(q.available_approx(), 0);

        assert_eq!(q.try_pop(), Ok(0));
        assert!(q.try_push(4).is_ok());
    }

    #[test]
    fn single_producer_order_is_preserved() {
        let q = RingQueue::with_capacity(16);
        for i in 0..10 {
            assert!(q.try_push(i).is_ok());
        }
        for i in 0..10 {
            assert_eq!(q.try_pop(), Ok(i));
        }
        assert_eq!(q.try_pop(), Err(TryPopError::Empty));
    }

    #[test]
    fn wraps_across_multiple_laps() {
        let q = RingQueue::with_capacity(3);
        for lap in 0..5usize {
            for i in 0..3 {
                assert!(q.try_push(lap * 3 + i).is_ok());
            }
            for i in 0..3 {
                assert_eq!(q.try_pop(), Ok(lap * 3 + i));
            }
        }
    }

    #[test]
    fn rejected_push_returns_the_item() {
        let q = RingQueue::with_capacity(1);
        q.try_push(String::from("first")).ok();
        let rejected = q.try_push(String::from("second")).unwrap_err();
        assert_eq!(rejected.into_inner(), "second");
    }

    #[test]
    fn drop_releases_unconsumed_items() {
        let q = RingQueue::with_capacity(4);
        q.try_push(std::sync::Arc::new(1u8)).ok();
        q.try_push(std::sync::Arc::new(2u8)).ok();
        drop(q);
    }
}

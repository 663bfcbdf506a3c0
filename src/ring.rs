//! MPMC Ring - Bounded lock-free queue for cross-thread hand-off.
//!
//! Every slot carries a sequence counter that encodes its state for the
//! current lap, so producers and consumers coordinate without a lock:
//!
//! | `seq` relative to position `pos` | Meaning                           |
//! |----------------------------------|-----------------------------------|
//! | `seq == pos`                     | vacant, writable on this lap      |
//! | `seq == pos + 1`                 | written, readable on this lap     |
//! | `seq == pos + capacity`          | vacant again, writable next lap   |
//!
//! Producers race on `head` with CAS, consumers race on `tail`. The value
//! itself is only touched by the thread that won the CAS for that position,
//! and is published to the other side by a `Release` store of the slot
//! sequence paired with an `Acquire` load.
//!
//! Neither `enqueue` nor `dequeue` ever blocks: "full" and "empty" are plain
//! return values and backoff is the caller's business.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

/// Smallest capacity a ring is ever built with.
pub const MIN_CAPACITY: usize = 2;

/// One storage cell of the ring.
struct Slot<T> {
    /// Lap-encoded state of this slot (see module docs)
    sequence: AtomicUsize,
    /// Element storage, initialized only between a publish and a consume
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded multi-producer/multi-consumer FIFO queue.
///
/// Capacity is fixed at construction and rounded up to a power of two so
/// that slot lookup is a mask instead of a division.
///
/// # Example
///
/// ```
/// use flash_book::MpmcRing;
///
/// let ring = MpmcRing::with_capacity(3);
/// assert_eq!(ring.capacity(), 4);
///
/// assert!(ring.enqueue(7).is_ok());
/// assert_eq!(ring.dequeue(), Some(7));
/// assert_eq!(ring.dequeue(), None);
/// ```
pub struct MpmcRing<T> {
    slots: Box<[Slot<T>]>,
    /// `capacity - 1`
    mask: usize,
    /// Next position a producer will claim
    head: CachePadded<AtomicUsize>,
    /// Next position a consumer will claim
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: a value is only ever accessed by the single thread whose CAS
// claimed its position, and ownership moves across threads through the
// Release/Acquire pair on the slot sequence. T must therefore be Send.
unsafe impl<T: Send> Send for MpmcRing<T> {}
unsafe impl<T: Send> Sync for MpmcRing<T> {}

impl<T> MpmcRing<T> {
    /// Create a ring holding at least `capacity` elements.
    ///
    /// Requests below [`MIN_CAPACITY`] are raised to it; everything is
    /// rounded up to the next power of two. Never fails.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY).next_power_of_two();

        // Slot i starts vacant for lap 0 at position i
        let slots = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Try to append `value` at the tail of the queue.
    ///
    /// # Returns
    /// - `Ok(())` if the value was published to consumers
    /// - `Err(value)` if the ring is full; the value is handed back untouched
    ///
    /// Contention with other producers is retried internally; a full ring
    /// returns immediately.
    #[inline]
    pub fn enqueue(&self, value: T) -> Result<(), T> {
        let mut pos = self.head.load(Ordering::Relaxed);

        let slot = loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                // Vacant for this lap: try to claim the position
                match self.head.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break slot,
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // Still holds the previous lap's value
                return Err(value);
            } else {
                // Another producer already claimed pos
                pos = self.head.load(Ordering::Relaxed);
            }
        };

        // SAFETY: the CAS above gave this thread exclusive ownership of the
        // slot until the sequence is published below.
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);

        Ok(())
    }

    /// Try to take the element at the head of the queue.
    ///
    /// # Returns
    /// `None` if no published element is available right now.
    #[inline]
    pub fn dequeue(&self) -> Option<T> {
        let mut pos = self.tail.load(Ordering::Relaxed);

        let slot = loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if diff == 0 {
                // Written for this lap: try to claim the position
                match self.tail.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break slot,
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // Not yet written for this lap
                return None;
            } else {
                // Another consumer already claimed pos
                pos = self.tail.load(Ordering::Relaxed);
            }
        };

        // SAFETY: the producer's Release store of pos + 1 happened-before our
        // Acquire load, so the value is initialized, and the CAS makes this
        // thread its only reader.
        let value = unsafe { (*slot.value.get()).assume_init_read() };

        // Vacant again for the producer one lap ahead
        slot.sequence
            .store(pos.wrapping_add(self.mask + 1), Ordering::Release);

        Some(value)
    }

    /// Snapshot check for `head == tail`.
    ///
    /// Advisory only: a concurrent producer may publish right after this
    /// returns. Use it for backoff heuristics, never for correctness.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head == tail
    }

    /// Approximate number of claimed-but-not-consumed positions.
    ///
    /// Same caveats as [`is_empty`](Self::is_empty). Clamped to capacity.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(self.capacity())
    }

    /// Snapshot check for a full ring. Advisory.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Fixed number of slots (always a power of two).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }
}

impl<T> Drop for MpmcRing<T> {
    fn drop(&mut self) {
        // Exclusive access: release every element still in flight
        while self.dequeue().is_some() {}
    }
}

impl<T> fmt::Debug for MpmcRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpmcRing")
            .field("capacity", &self.capacity())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}

//! A single-producer, single-consumer (SPSC) lock-free byte queue.
//!
//! The receive interrupt handler is the sole producer and foreground code
//! the sole consumer, so no locks are needed: the two sides synchronize
//! through the `read`/`write` indices alone.

use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// A lock-free SPSC queue storing up to `N` bytes.
///
/// The indices are free-running and wrapped with a mask on access, which
/// requires `N` to be a power of two. `write - read` is the fill level.
///
/// Declare one as a `static` and call [`RxQueue::try_split`] once at startup
/// to obtain the producer half (handed to the interrupt handler) and the
/// consumer half (kept by the foreground reader).
pub struct RxQueue<const N: usize> {
    buf: [UnsafeCell<MaybeUninit<u8>>; N],
    /// Where the next read starts. Owned by the consumer.
    read: AtomicUsize,
    /// Where the next write starts. Owned by the producer.
    write: AtomicUsize,
    /// Set once the queue has been split into its two endpoints.
    split: AtomicBool,
}

// SAFETY: The `UnsafeCell` slots are only accessed through the single
// `Producer` and single `Consumer`, which maintain the SPSC invariant via
// the atomic indices.
unsafe impl<const N: usize> Sync for RxQueue<N> {}

/// Writes bytes into the queue. Safe to use from interrupt context.
pub struct Producer<'a, const N: usize> {
    queue: &'a RxQueue<N>,
}

/// Reads bytes previously written to the queue.
pub struct Consumer<'a, const N: usize> {
    queue: &'a RxQueue<N>,
}

// SAFETY: Only one endpoint of each kind exists per queue (enforced by
// `try_split`), and all shared state is accessed through atomics.
unsafe impl<const N: usize> Send for Producer<'_, N> {}
// SAFETY: As above.
unsafe impl<const N: usize> Send for Consumer<'_, N> {}

impl<const N: usize> RxQueue<N> {
    const CAPACITY_IS_POWER_OF_TWO: () = assert!(N.is_power_of_two());

    /// Create an empty queue.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_IS_POWER_OF_TWO;

        Self {
            buf: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
            split: AtomicBool::new(false),
        }
    }

    /// Split the queue into its producer and consumer endpoints.
    ///
    /// Succeeds exactly once per queue; later calls return `None`. This is
    /// what upholds the single-producer/single-consumer contract without
    /// needing `&mut` access to a `static`.
    pub fn try_split(&self) -> Option<(Producer<'_, N>, Consumer<'_, N>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((Producer { queue: self }, Consumer { queue: self }))
    }
}

impl<const N: usize> Default for RxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Producer<'_, N> {
    /// Append one byte to the queue.
    ///
    /// Never blocks. If the queue is full the byte is discarded and `false`
    /// is returned (drop-newest policy).
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        // Acquire: synchronizes with the consumer's Release store so the
        // slot being recycled is no longer read on the other side. A stale
        // value only underestimates the free space.
        let read = self.queue.read.load(Ordering::Acquire);
        // Relaxed: the producer owns `write`.
        let write = self.queue.write.load(Ordering::Relaxed);

        if write.wrapping_sub(read) == N {
            return false;
        }

        let slot = self.queue.buf[write & (N - 1)].get();
        // SAFETY: `write - read < N` means this slot is not owned by the
        // consumer, and we are the only producer.
        unsafe { slot.write(MaybeUninit::new(byte)) };

        // Release: publishes the slot write before the index moves.
        self.queue
            .write
            .store(write.wrapping_add(1), Ordering::Release);
        true
    }
}

impl<const N: usize> Consumer<'_, N> {
    /// Remove and return the oldest byte, or `None` if the queue is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        // Acquire: synchronizes with the producer's Release store so the
        // data written to the slot is visible.
        let write = self.queue.write.load(Ordering::Acquire);
        // Relaxed: the consumer owns `read`.
        let read = self.queue.read.load(Ordering::Relaxed);

        if write == read {
            return None;
        }

        let slot = self.queue.buf[read & (N - 1)].get();
        // SAFETY: `read != write` means the producer has initialized this
        // slot and no longer touches it until `read` moves past it.
        let byte = unsafe { (*slot).assume_init() };

        // Release: hands the slot back to the producer.
        self.queue.read.store(read.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Number of bytes currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        let write = self.queue.write.load(Ordering::Acquire);
        let read = self.queue.read.load(Ordering::Relaxed);
        write.wrapping_sub(read)
    }

    /// Returns `true` if no bytes are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

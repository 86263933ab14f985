//! Lock-free single-producer single-consumer ring
//!
//! The transport between pinned pipeline workers. One thread owns the
//! [`Producer`] handle, one thread owns the [`Consumer`] handle; the split
//! is enforced at the type level (the handles are not `Clone`), so the
//! single-producer/single-consumer contract cannot be violated without
//! constructing a second ring.
//!
//! Layout and ordering:
//! - `head` (atomic) and the producer's cached copy of `tail` live on one
//!   cache line; `tail` (atomic) and the consumer's cached copy of `head`
//!   on another; the storage array starts on a fresh line. No false sharing
//!   between the two sides.
//! - The producer writes the slot, then publishes the new head with a
//!   release store. The consumer loads head with acquire before reading the
//!   slot and advances tail with a release store.
//! - Each side consults its cached copy of the opposite index first and
//!   refreshes it with a single acquire load only when it appears to be at
//!   a boundary, eliding the atomic load on the common path.
//!
//! Indices are unbounded-monotonic `usize` values; the slot is
//! `index & (N - 1)`, so wraparound is handled by wrapping arithmetic.
//! Capacity is a compile-time power of two of at least 16.
//!
//! Slot prefetch (next-write before the store, next-read before the load)
//! is a hint only; correctness does not depend on it.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

/// Smallest supported capacity.
pub const MIN_CAPACITY: usize = 16;

#[inline(always)]
fn prefetch_read<T>(ptr: *const T) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch(ptr as *const i8, _MM_HINT_T0);
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = ptr;
}

#[inline(always)]
fn prefetch_write<T>(ptr: *const T) {
    // No dedicated write hint on stable; T0 keeps the line close either way.
    prefetch_read(ptr);
}

struct Shared<T, const N: usize> {
    /// Producer cache line: published head index.
    head: CachePadded<AtomicUsize>,
    /// Consumer cache line: published tail index.
    tail: CachePadded<AtomicUsize>,
    /// Slot storage, on its own cache lines behind the two index lines.
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// The producer writes a slot strictly before publishing it via `head`
// (release), and the consumer reads it strictly after observing `head`
// (acquire); slots are never accessed concurrently from both sides.
unsafe impl<T: Send, const N: usize> Sync for Shared<T, N> {}
unsafe impl<T: Send, const N: usize> Send for Shared<T, N> {}

impl<T: Copy, const N: usize> Shared<T, N> {
    const MASK: usize = N - 1;

    fn new() -> Arc<Self> {
        const {
            assert!(N >= MIN_CAPACITY, "ring capacity must be at least 16");
            assert!(N.is_power_of_two(), "ring capacity must be a power of two");
        }
        let buffer = (0..N)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Arc::new(Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            buffer,
        })
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        self.buffer[index & Self::MASK].get()
    }

    #[inline(always)]
    fn size_approx(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }
}

/// Create a ring of capacity `N`, returning the two endpoint handles.
///
/// `N` must be a power of two and at least 16; both are checked at compile
/// time. Storage is allocated here, once, at startup -- the handles never
/// allocate again.
pub fn channel<T: Copy + Send, const N: usize>() -> (Producer<T, N>, Consumer<T, N>) {
    let shared = Shared::<T, N>::new();
    (
        Producer {
            shared: Arc::clone(&shared),
            cached_tail: 0,
        },
        Consumer {
            shared,
            cached_head: 0,
        },
    )
}

/// Producing endpoint. Exactly one thread may own this.
pub struct Producer<T, const N: usize> {
    shared: Arc<Shared<T, N>>,
    /// Private copy of the consumer's tail, refreshed on perceived full.
    cached_tail: usize,
}

impl<T: Copy + Send, const N: usize> Producer<T, N> {
    /// Enqueue if the ring is not full. Never blocks.
    #[inline(always)]
    pub fn try_push(&mut self, item: T) -> bool {
        let head = self.shared.head.load(Ordering::Relaxed);
        let next = head.wrapping_add(1);

        if next.wrapping_sub(self.cached_tail) > N {
            self.cached_tail = self.shared.tail.load(Ordering::Acquire);
            if next.wrapping_sub(self.cached_tail) > N {
                return false;
            }
        }

        prefetch_write(self.shared.slot(next));

        unsafe { (*self.shared.slot(head)).write(item) };
        self.shared.head.store(next, Ordering::Release);
        true
    }

    /// Spin with a CPU pause hint until the push succeeds.
    ///
    /// Can stall the caller indefinitely if the consumer is gone; hot paths
    /// prefer [`Producer::try_push`] and count drops.
    #[inline]
    pub fn push_blocking(&mut self, item: T) {
        while !self.try_push(item) {
            std::hint::spin_loop();
        }
    }

    /// Racy element-count observer.
    #[inline(always)]
    pub fn size_approx(&self) -> usize {
        self.shared.size_approx()
    }

    /// Racy emptiness observer.
    #[inline(always)]
    pub fn empty_approx(&self) -> bool {
        self.shared.size_approx() == 0
    }

    /// Racy fullness observer.
    #[inline(always)]
    pub fn full_approx(&self) -> bool {
        self.shared.size_approx() >= N
    }

    /// Compile-time capacity.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }
}

/// Consuming endpoint. Exactly one thread may own this.
pub struct Consumer<T, const N: usize> {
    shared: Arc<Shared<T, N>>,
    /// Private copy of the producer's head, refreshed on perceived empty.
    cached_head: usize,
}

impl<T: Copy + Send, const N: usize> Consumer<T, N> {
    /// Dequeue the oldest element if present.
    ///
    /// Returns `false` on empty with `*out` untouched.
    #[inline(always)]
    pub fn try_pop(&mut self, out: &mut T) -> bool {
        let tail = self.shared.tail.load(Ordering::Relaxed);

        if self.cached_head == tail {
            self.cached_head = self.shared.head.load(Ordering::Acquire);
            if self.cached_head == tail {
                return false;
            }
        }

        prefetch_read(self.shared.slot(tail.wrapping_add(1)));

        *out = unsafe { (*self.shared.slot(tail)).assume_init() };
        self.shared.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Non-destructive read of the oldest element.
    #[inline]
    pub fn try_peek(&self, out: &mut T) -> bool {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let head = self.shared.head.load(Ordering::Acquire);
        if head == tail {
            return false;
        }
        *out = unsafe { (*self.shared.slot(tail)).assume_init() };
        true
    }

    /// Spin with a CPU pause hint until an element arrives.
    #[inline]
    pub fn pop_blocking(&mut self, out: &mut T) {
        while !self.try_pop(out) {
            std::hint::spin_loop();
        }
    }

    /// Dequeue up to `out.len()` contiguous elements in insertion order.
    ///
    /// Semantically equivalent to that many successful `try_pop` calls, but
    /// takes one head snapshot and issues one tail store for the whole
    /// batch.
    #[inline]
    pub fn try_pop_batch(&mut self, out: &mut [T]) -> usize {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let head = self.shared.head.load(Ordering::Acquire);
        self.cached_head = head;

        let available = head.wrapping_sub(tail);
        let count = available.min(out.len());
        if count == 0 {
            return 0;
        }

        for (i, slot) in out.iter_mut().take(count).enumerate() {
            *slot = unsafe { (*self.shared.slot(tail.wrapping_add(i))).assume_init() };
        }

        self.shared
            .tail
            .store(tail.wrapping_add(count), Ordering::Release);
        count
    }

    /// Racy element-count observer.
    #[inline(always)]
    pub fn size_approx(&self) -> usize {
        self.shared.size_approx()
    }

    /// Racy emptiness observer.
    #[inline(always)]
    pub fn empty_approx(&self) -> bool {
        self.shared.size_approx() == 0
    }

    /// Racy fullness observer.
    #[inline(always)]
    pub fn full_approx(&self) -> bool {
        self.shared.size_approx() >= N
    }

    /// Compile-time capacity.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_push_pop_single() {
        let (mut tx, mut rx) = channel::<u64, 16>();
        assert!(tx.try_push(42));
        let mut out = 0u64;
        assert!(rx.try_pop(&mut out));
        assert_eq!(out, 42);
        assert!(rx.empty_approx());
    }

    #[test]
    fn test_pop_empty_leaves_out_untouched() {
        let (_tx, mut rx) = channel::<u64, 16>();
        let mut out = 77u64;
        assert!(!rx.try_pop(&mut out));
        assert_eq!(out, 77);
    }

    #[test]
    fn test_fill_reject_then_drain_in_order() {
        let (mut tx, mut rx) = channel::<u64, 16>();

        for i in 0..16 {
            assert!(tx.try_push(i), "push {} should succeed", i);
        }
        // 17th push must fail without corrupting the oldest element.
        assert!(!tx.try_push(999));
        assert!(tx.full_approx());

        let mut out = 0u64;
        assert!(rx.try_peek(&mut out));
        assert_eq!(out, 0, "oldest element intact after rejected push");

        for i in 0..4 {
            assert!(rx.try_pop(&mut out));
            assert_eq!(out, i);
        }
        for v in 30..34 {
            assert!(tx.try_push(v));
        }

        let mut drained = Vec::new();
        while rx.try_pop(&mut out) {
            drained.push(out);
        }
        let expected: Vec<u64> = (4..16).chain(30..34).collect();
        assert_eq!(drained, expected);
        assert!(rx.empty_approx());
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let (mut tx, mut rx) = channel::<u32, 16>();
        for round in 0..100u32 {
            assert!(tx.size_approx() <= 16);
            tx.try_push(round);
            if round % 3 == 0 {
                let mut out = 0;
                rx.try_pop(&mut out);
            }
        }
        assert!(tx.size_approx() <= 16);
    }

    #[test]
    fn test_balanced_push_pop_leaves_empty() {
        let (mut tx, mut rx) = channel::<u32, 64>();
        let mut out = 0;
        for i in 0..1000 {
            assert!(tx.try_push(i));
            assert!(rx.try_pop(&mut out));
            assert_eq!(out, i);
        }
        assert!(rx.empty_approx());
        assert_eq!(tx.size_approx(), 0);
    }

    #[test]
    fn test_peek_is_non_destructive() {
        let (mut tx, mut rx) = channel::<u64, 16>();
        tx.try_push(5);
        let mut out = 0u64;
        assert!(rx.try_peek(&mut out));
        assert_eq!(out, 5);
        assert_eq!(rx.size_approx(), 1);
        assert!(rx.try_pop(&mut out));
        assert_eq!(out, 5);
    }

    #[test]
    fn test_batch_pop_returns_min_of_requested_and_available() {
        let (mut tx, mut rx) = channel::<u64, 32>();
        for i in 0..10 {
            tx.try_push(i);
        }

        let mut buf = [0u64; 4];
        assert_eq!(rx.try_pop_batch(&mut buf), 4);
        assert_eq!(buf, [0, 1, 2, 3]);

        let mut big = [0u64; 16];
        assert_eq!(rx.try_pop_batch(&mut big), 6);
        assert_eq!(&big[..6], &[4, 5, 6, 7, 8, 9]);

        assert_eq!(rx.try_pop_batch(&mut big), 0);
    }

    #[test]
    fn test_wraparound_many_times() {
        let (mut tx, mut rx) = channel::<u64, 16>();
        let mut out = 0u64;
        for i in 0..10_000u64 {
            assert!(tx.try_push(i));
            assert!(rx.try_pop(&mut out));
            assert_eq!(out, i);
        }
    }

    #[test]
    fn test_two_thread_fifo() {
        const COUNT: u64 = 100_000;
        let (mut tx, mut rx) = channel::<u64, 1024>();

        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                tx.push_blocking(i);
            }
        });

        let consumer = thread::spawn(move || {
            let mut out = 0u64;
            for expected in 0..COUNT {
                rx.pop_blocking(&mut out);
                assert_eq!(out, expected, "FIFO order violated");
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();
    }

    #[test]
    fn test_two_thread_batch_consumer() {
        const COUNT: u64 = 50_000;
        let (mut tx, mut rx) = channel::<u64, 256>();

        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                tx.push_blocking(i);
            }
        });

        let consumer = thread::spawn(move || {
            let mut buf = [0u64; 16];
            let mut next = 0u64;
            while next < COUNT {
                let n = rx.try_pop_batch(&mut buf);
                for &v in &buf[..n] {
                    assert_eq!(v, next);
                    next += 1;
                }
                if n == 0 {
                    std::hint::spin_loop();
                }
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();
    }
}

// kernel/src/console/ring.rs
//
// Lock-free single-producer/single-consumer byte ring.
// - Producer: the keyboard IRQ handler (push).
// - Consumer: the read-character syscall, via the console (pop).
// - Each side owns one cursor; a full ring drops new bytes, it never overwrites.
// - Capacity is N - 1: `write + 1 == read` means full.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

pub const KEYBOARD_BUFFER_SIZE: usize = 256;

/// Decoded keystrokes waiting for a reader.
pub static KEYBOARD_BUFFER: RingBuffer<KEYBOARD_BUFFER_SIZE> = RingBuffer::new();

pub struct RingBuffer<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    read: AtomicUsize,
    write: AtomicUsize,
}

// Safety: the producer only writes the slot at `write` before publishing it,
// the consumer only reads the slot at `read` after observing it published.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        RingBuffer {
            buf: UnsafeCell::new([0; N]),
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        }
    }

    /// Producer side. Returns false (and drops `byte`) when full.
    pub fn push(&self, byte: u8) -> bool {
        let w = self.write.load(Ordering::Relaxed);
        let next = (w + 1) % N;
        if next == self.read.load(Ordering::Acquire) {
            return false;
        }
        unsafe { self.buf.get().cast::<u8>().add(w).write(byte) };
        self.write.store(next, Ordering::Release);
        true
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<u8> {
        let r = self.read.load(Ordering::Relaxed);
        if r == self.write.load(Ordering::Acquire) {
            return None;
        }
        let byte = unsafe { self.buf.get().cast::<u8>().add(r).read() };
        self.read.store((r + 1) % N, Ordering::Release);
        Some(byte)
    }

    pub fn len(&self) -> usize {
        let w = self.write.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Acquire);
        (w + N - r) % N
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let ring = RingBuffer::<8>::new();
        assert!(ring.is_empty());
        for b in b"abc" {
            assert!(ring.push(*b));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        assert_eq!(ring.pop(), Some(b'c'));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn full_ring_drops_new_bytes() {
        let ring = RingBuffer::<4>::new();
        assert_eq!(ring.capacity(), 3);
        assert!(ring.push(1));
        assert!(ring.push(2));
        assert!(ring.push(3));
        assert!(!ring.push(4), "full");
        assert_eq!(ring.pop(), Some(1), "oldest byte survives");
        assert!(ring.push(5));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), Some(5));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn cursors_wrap_around() {
        let ring = RingBuffer::<4>::new();
        for round in 0..10u8 {
            assert!(ring.push(round));
            assert!(ring.push(round.wrapping_add(100)));
            assert_eq!(ring.pop(), Some(round));
            assert_eq!(ring.pop(), Some(round.wrapping_add(100)));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn producer_and_consumer_threads() {
        use std::sync::Arc;

        let ring = Arc::new(RingBuffer::<16>::new());
        let producer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for b in 0..=200u8 {
                    while !ring.push(b) {
                        std::thread::yield_now();
                    }
                }
            })
        };

        let mut expected = 0u16;
        while expected <= 200 {
            if let Some(b) = ring.pop() {
                assert_eq!(b as u16, expected);
                expected += 1;
            } else {
                std::thread::yield_now();
            }
        }
        producer.join().expect("producer");
    }
}

//! Circular byte storage with head/tail/used bookkeeping
//!
//! `RingStorage` has no concurrency awareness of its own; every method expects
//! the caller to hold the queue lock.

use std::ops::Range;

use crate::{
    boundary::{ByteSink, ByteSource},
    error::{QueueError, Result},
};

/// Index snapshot used to undo a partially applied frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    head: usize,
    tail: usize,
    used: usize,
}

/// Fixed-capacity byte ring
#[derive(Debug, Default)]
pub struct RingStorage {
    /// Byte storage, `storage.len()` is the capacity
    storage: Vec<u8>,
    /// Index of the oldest unread byte
    head: usize,
    /// Index of the next write position
    tail: usize,
    /// Number of live bytes
    used: usize,
}

impl RingStorage {
    /// Ring with no storage (capacity 0)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Allocate a zeroed ring of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| QueueError::out_of_memory(capacity))?;
        storage.resize(capacity, 0);

        Ok(Self {
            storage,
            head: 0,
            tail: 0,
            used: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn free(&self) -> usize {
        self.capacity() - self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            head: self.head,
            tail: self.tail,
            used: self.used,
        }
    }

    /// Roll indices back to a checkpoint taken on this same storage
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.head = checkpoint.head;
        self.tail = checkpoint.tail;
        self.used = checkpoint.used;
    }

    /// Append bytes owned by the ring itself (headers)
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.free() {
            return Err(QueueError::message_too_large(bytes.len(), self.free()));
        }
        for &byte in bytes {
            self.storage[self.tail] = byte;
            self.tail = (self.tail + 1) % self.capacity();
        }
        self.used += bytes.len();
        Ok(())
    }

    /// Copy `dst.len()` bytes starting `offset` bytes past `head` without
    /// consuming them
    pub fn peek_bytes(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        if offset + dst.len() > self.used {
            return Err(QueueError::would_block("not enough buffered bytes"));
        }
        for (i, byte) in dst.iter_mut().enumerate() {
            *byte = self.storage[(self.head + offset + i) % self.capacity()];
        }
        Ok(())
    }

    /// Drop `len` buffered bytes from the head
    pub fn discard(&mut self, len: usize) -> Result<()> {
        if len > self.used {
            return Err(QueueError::would_block("not enough buffered bytes"));
        }
        self.advance_head(len);
        Ok(())
    }

    /// Copy the whole source into the ring.
    ///
    /// Indices advance segment by segment, so on error they reflect only the
    /// bytes actually transferred; the caller restores its checkpoint.
    pub fn write_from<S: ByteSource + ?Sized>(&mut self, src: &S) -> Result<()> {
        let len = src.len();
        if len > self.free() {
            return Err(QueueError::message_too_large(len, self.free()));
        }

        let mut copied = 0;
        for range in self.segments(self.tail, len).into_iter().filter(|r| !r.is_empty()) {
            let seg_len = range.len();
            src.copy_to(copied, &mut self.storage[range])?;
            copied += seg_len;
            self.tail = (self.tail + seg_len) % self.capacity();
            self.used += seg_len;
        }
        Ok(())
    }

    /// Copy `len` bytes from the head of the ring into the sink
    pub fn read_into<S: ByteSink + ?Sized>(&mut self, len: usize, sink: &mut S) -> Result<()> {
        if len > self.used {
            return Err(QueueError::would_block("not enough buffered bytes"));
        }

        let mut copied = 0;
        for range in self.segments(self.head, len).into_iter().filter(|r| !r.is_empty()) {
            let seg_len = range.len();
            sink.copy_from(copied, &self.storage[range])?;
            copied += seg_len;
            self.advance_head(seg_len);
        }
        Ok(())
    }

    fn advance_head(&mut self, len: usize) {
        self.head = (self.head + len) % self.capacity();
        self.used -= len;
    }

    /// Split `len` bytes starting at `start` into at most two contiguous ranges
    fn segments(&self, start: usize, len: usize) -> [Range<usize>; 2] {
        let first_len = len.min(self.capacity() - start);
        [start..start + first_len, 0..len - first_len]
    }
}

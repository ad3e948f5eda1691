//! Byte-copy boundary between the queue and its callers
//!
//! The queue never touches caller memory directly. Payload bytes are pulled in
//! through a [`ByteSource`] and pushed out through a [`ByteSink`]; both may fail
//! with [`QueueError::Fault`] independently of queue state, and the queue rolls
//! its indices back when they do.

use crate::error::{QueueError, Result};

/// Caller-owned bytes the queue reads from during a push
pub trait ByteSource {
    /// Number of bytes the caller offers
    fn len(&self) -> usize;

    /// Whether the source offers no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`
    fn copy_to(&self, offset: usize, dst: &mut [u8]) -> Result<()>;
}

/// Caller-owned destination the queue writes to during a pop
pub trait ByteSink {
    /// Maximum number of bytes the caller can receive
    fn capacity(&self) -> usize;

    /// Copy `src` into the destination starting at `offset`
    fn copy_from(&mut self, offset: usize, src: &[u8]) -> Result<()>;
}

impl ByteSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(dst.len())
            .filter(|end| *end <= <[u8]>::len(self))
            .ok_or_else(|| QueueError::fault("read past end of source"))?;
        dst.copy_from_slice(&self[offset..end]);
        Ok(())
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn copy_to(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.as_slice().copy_to(offset, dst)
    }
}

/// Growable sink bounded by a declared receive capacity
#[derive(Debug, Default)]
pub struct VecSink {
    data: Vec<u8>,
    capacity: usize,
}

impl VecSink {
    /// Create a sink that accepts at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
        }
    }

    /// Take the received bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ByteSink for VecSink {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn copy_from(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(src.len())
            .filter(|end| *end <= self.capacity)
            .ok_or_else(|| QueueError::fault("write past end of sink"))?;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(src);
        Ok(())
    }
}

/// Fixed-size sink over a caller buffer
#[derive(Debug)]
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
}

impl<'a> SliceSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }
}

impl ByteSink for SliceSink<'_> {
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn copy_from(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(src.len())
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| QueueError::fault("write past end of sink"))?;
        self.buf[offset..end].copy_from_slice(src);
        Ok(())
    }
}

//! Packing typed messages into a [`RingStorage`] and unpacking them again
//!
//! Both directions are transactional: if a caller copy fails midway the ring
//! is restored to the checkpoint taken before the frame was touched.

use crate::{
    boundary::{ByteSink, ByteSource},
    error::{QueueError, Result},
};

use super::{
    message::{FrameHeader, HEADER_SIZE},
    ring::RingStorage,
};

/// Total frame size for a payload of `payload_len` bytes, if representable
pub fn frame_len(payload_len: usize) -> Option<usize> {
    u32::try_from(payload_len).ok()?;
    payload_len.checked_add(HEADER_SIZE)
}

/// Append one frame. The caller has already checked there is room.
pub fn write_frame<S: ByteSource + ?Sized>(
    ring: &mut RingStorage,
    msg_type: i32,
    payload: &S,
) -> Result<FrameHeader> {
    let length = u32::try_from(payload.len())
        .map_err(|_| QueueError::message_too_large(payload.len(), u32::MAX as usize))?;
    let header = FrameHeader::new(msg_type, length);
    if header.frame_len() > ring.free() {
        return Err(QueueError::message_too_large(header.frame_len(), ring.free()));
    }

    let checkpoint = ring.checkpoint();
    let result = ring
        .put_bytes(&header.encode())
        .and_then(|_| ring.write_from(payload));

    if let Err(e) = result {
        ring.restore(checkpoint);
        return Err(e);
    }
    Ok(header)
}

/// Decode the header at `head` without consuming anything
pub fn peek_header(ring: &RingStorage) -> Option<FrameHeader> {
    if ring.used() < HEADER_SIZE {
        return None;
    }
    let mut buf = [0u8; HEADER_SIZE];
    ring.peek_bytes(0, &mut buf).ok()?;
    Some(FrameHeader::decode(&buf))
}

/// Remove the oldest frame, copying its payload into `sink`.
///
/// A payload longer than the sink's capacity yields `MessageTooLarge` and
/// leaves the frame buffered.
pub fn read_frame<S: ByteSink + ?Sized>(ring: &mut RingStorage, sink: &mut S) -> Result<FrameHeader> {
    let header = peek_header(ring).ok_or_else(|| QueueError::would_block("no complete header"))?;
    let length = header.length as usize;

    if length > sink.capacity() {
        return Err(QueueError::message_too_large(length, sink.capacity()));
    }
    // Frames are only ever written whole
    debug_assert!(
        header.frame_len() <= ring.used(),
        "frame of {} bytes exceeds {} buffered bytes",
        header.frame_len(),
        ring.used()
    );

    let checkpoint = ring.checkpoint();
    let result = ring
        .discard(HEADER_SIZE)
        .and_then(|_| ring.read_into(length, sink));

    if let Err(e) = result {
        ring.restore(checkpoint);
        return Err(e);
    }
    Ok(header)
}

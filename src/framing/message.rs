//! Typed messages and their in-ring header

use serde::{Deserialize, Serialize};

/// Size of the encoded header: 4 bytes type + 4 bytes length
pub const HEADER_SIZE: usize = 8;

/// Well-known message type tags used by the bundled tools
pub mod message_types {
    /// Log line produced by `fill`, consumed by `read`
    pub const LOG: i32 = 100;
    /// Job request `"<id>:<command>"` produced by `submit`, consumed by `work`
    pub const JOB: i32 = 200;
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Producer-chosen type tag
    pub msg_type: i32,
    /// Payload length in bytes
    pub length: u32,
}

impl FrameHeader {
    pub fn new(msg_type: i32, length: u32) -> Self {
        Self { msg_type, length }
    }

    /// Bytes the whole frame occupies in the ring
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }

    /// Encode as two little-endian 32-bit words
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.msg_type.to_le_bytes());
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            msg_type: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            length: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

/// A typed message as seen by producers and consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub msg_type: i32,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(msg_type: i32, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }

    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

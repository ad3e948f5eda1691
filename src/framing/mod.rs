//! Framed circular byte buffer
//!
//! Messages are stored back to back in a single byte ring as
//! `type (4 bytes LE) | length (4 bytes LE) | payload (length bytes)`.

pub mod frame;
pub mod message;
pub mod ring;


// Re-export main types for convenience
pub use frame::{frame_len, peek_header, read_frame, write_frame};
pub use message::{message_types, FrameHeader, Message, HEADER_SIZE};
pub use ring::{Checkpoint, RingStorage};

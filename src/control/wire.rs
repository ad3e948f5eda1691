//! Length-prefixed bincode frames for control requests and responses
//!
//! ```text
//! ┌────────────────────┬──────────────────────────┐
//! │ Length (u32 LE)    │ bincode body             │
//! │ 4 bytes            │ `length` bytes           │
//! └────────────────────┴──────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{QueueError, Result};

/// Length prefix size in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Serialize `value` and write it as one frame
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let body = bincode::serialize(value)?;
    let length = u32::try_from(body.len())
        .map_err(|_| QueueError::protocol(format!("frame of {} bytes too large", body.len())))?;

    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream before the length prefix.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R, max_frame_size: usize) -> Result<Option<T>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    match reader.read_exact(&mut prefix) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(QueueError::from_io(e, "reading frame length")),
    }

    let length = u32::from_le_bytes(prefix) as usize;
    if length > max_frame_size {
        return Err(QueueError::protocol(format!(
            "frame of {} bytes exceeds limit of {}",
            length, max_frame_size
        )));
    }

    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .map_err(|e| QueueError::from_io(e, "reading frame body"))?;

    Ok(Some(bincode::deserialize(&body)?))
}

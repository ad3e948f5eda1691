//! Control codes and the C-compatible argument layouts they encode
//!
//! The request numbers are the Linux ioctl numbers of the queue device:
//! magic `'a'`, sequence `'a'..'d'`, direction and argument size encoded as
//! `_IOW`/`_IOWR`/`_IOR` would.

use std::{
    ffi::{c_char, c_int},
    mem::size_of,
};

use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};

/// ioctl magic byte
pub const IOCTL_MAGIC: u8 = b'a';

/// Argument of Push/Pop: `struct data { int type; int length; char *data; }`.
///
/// On Pop, `length` is the receive capacity of `data` on input and the message
/// length on output.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct QueueData {
    pub msg_type: c_int,
    pub length: c_int,
    pub data: *mut c_char,
}

/// Argument of Stats
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsData {
    pub capacity_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub total_pushes: u64,
    pub total_pops: u64,
    pub blocked_readers: u64,
    pub blocked_writers: u64,
}

impl From<crate::queue::StatsSnapshot> for QueueStatsData {
    fn from(s: crate::queue::StatsSnapshot) -> Self {
        Self {
            capacity_bytes: s.capacity_bytes,
            used_bytes: s.used_bytes,
            free_bytes: s.free_bytes,
            total_pushes: s.total_pushes,
            total_pops: s.total_pops,
            blocked_readers: s.blocked_readers,
            blocked_writers: s.blocked_writers,
        }
    }
}

/// `_IOW('a', 'a', int)`
pub const SET_SIZE_OF_QUEUE: u64 =
    nix::request_code_write!(IOCTL_MAGIC, b'a', size_of::<c_int>()) as u64;
/// `_IOW('a', 'b', struct data)`
pub const PUSH_DATA: u64 =
    nix::request_code_write!(IOCTL_MAGIC, b'b', size_of::<QueueData>()) as u64;
/// `_IOWR('a', 'c', struct data)`
pub const POP_DATA: u64 =
    nix::request_code_readwrite!(IOCTL_MAGIC, b'c', size_of::<QueueData>()) as u64;
/// `_IOR('a', 'd', struct stats)`
pub const QUEUE_STATS: u64 =
    nix::request_code_read!(IOCTL_MAGIC, b'd', size_of::<QueueStatsData>()) as u64;

/// Control operations understood by the queue device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlCode {
    SetCapacity,
    Push,
    Pop,
    Stats,
}

impl ControlCode {
    pub const ALL: [ControlCode; 4] = [
        ControlCode::SetCapacity,
        ControlCode::Push,
        ControlCode::Pop,
        ControlCode::Stats,
    ];

    /// ioctl request number
    pub fn raw(self) -> u64 {
        match self {
            ControlCode::SetCapacity => SET_SIZE_OF_QUEUE,
            ControlCode::Push => PUSH_DATA,
            ControlCode::Pop => POP_DATA,
            ControlCode::Stats => QUEUE_STATS,
        }
    }

    /// Decode a request number; unknown numbers are `InvalidOperation`
    pub fn from_raw(raw: u64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|code| code.raw() == raw)
            .ok_or_else(|| QueueError::invalid_operation(raw))
    }

    pub fn name(self) -> &'static str {
        match self {
            ControlCode::SetCapacity => "SET_SIZE_OF_QUEUE",
            ControlCode::Push => "PUSH_DATA",
            ControlCode::Pop => "POP_DATA",
            ControlCode::Stats => "QUEUE_STATS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_and_decode() {
        for code in ControlCode::ALL {
            assert_eq!(ControlCode::from_raw(code.raw()).unwrap(), code);
        }
        assert_ne!(SET_SIZE_OF_QUEUE, PUSH_DATA);
        assert_ne!(PUSH_DATA, POP_DATA);
    }

    #[test]
    fn test_unknown_code_is_invalid_operation() {
        let err = ControlCode::from_raw(0x1234).unwrap_err();
        assert!(matches!(err, QueueError::InvalidOperation { code: 0x1234 }));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu", any(target_arch = "x86_64", target_arch = "aarch64")))]
    #[test]
    fn test_linux_request_numbers() {
        // _IOW('a', 'a', int) and _IOWR('a', 'c', struct data) on x86_64/aarch64
        assert_eq!(SET_SIZE_OF_QUEUE, 0x4004_6161);
        assert_eq!(PUSH_DATA, 0x4010_6162);
        assert_eq!(POP_DATA, 0xc010_6163);
    }
}

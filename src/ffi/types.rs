//! FFI type definitions and handle types

use std::ffi::c_void;

/// Opaque queue handle for the C API
pub type TypedqQueueHandle = *mut c_void;

/// `struct data` argument of Push/Pop
pub type TypedqData = crate::control::QueueData;

/// Statistics filled in by `typedq_queue_stats` and the Stats control code
pub type TypedqStats = crate::control::QueueStatsData;

/// Status codes of the handle-management functions.
///
/// `typedq_ioctl` returns negative errno values instead, as a driver would.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedqErrorCode {
    Success = 0,
    /// Null handle or output pointer
    InvalidParameter = 1,
    /// Handle was never issued or is already destroyed
    UnknownHandle = 2,
}

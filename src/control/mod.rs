//! Control plane
//!
//! Numeric control codes, typed requests and responses, the per-queue
//! dispatcher and the frame codec used by the socket endpoint.

pub mod codes;
pub mod device;
pub mod request;
pub mod wire;

pub use codes::{
    ControlCode, QueueData, QueueStatsData, IOCTL_MAGIC, POP_DATA, PUSH_DATA, QUEUE_STATS,
    SET_SIZE_OF_QUEUE,
};
pub use device::{QueueDevice, Session};
pub use request::{ControlRequest, ControlResponse, WireError};
pub use wire::{read_frame, write_frame, LENGTH_PREFIX_SIZE};

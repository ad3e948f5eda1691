//! Synchronization core for the message queue
//!
//! Key pieces:
//! - [`Monitor`]: a mutex guarding the ring plus space/data condition variables
//! - [`CancelToken`]: interruption of parked callers, with prompt wakeup

pub mod cancel;
pub mod monitor;

pub use cancel::{CancelToken, Registration, Wake};
pub use monitor::{Monitor, WaitCondition};

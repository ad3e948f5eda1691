//! # typedq - Bounded Typed Message Queue
//!
//! typedq is a blocking, bounded message queue of typed, length-prefixed
//! messages stored back to back in a single circular byte buffer. Any number
//! of producers and consumers may contend on one queue; each caller blocks on
//! its own thread until its condition holds.
//!
//! ## Features
//!
//! - **Framed ring**: `type | length | payload`, integers little-endian
//! - **Monitor synchronization**: one lock, space/data condition variables
//! - **Interruption**: parked callers return `Interrupted` on cancellation
//! - **Transactional copies**: caller-copy faults never corrupt the ring
//! - **Control plane**: ioctl-style codes, local socket endpoint, C API
//! - **Statistics**: non-blocking counters with a `/proc`-style rendering
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │   C API (ffi)      │  Endpoint (Unix socket)    │
//! ├─────────────────────────────────────────────────┤
//! │        Control plane: codes, device, wire       │
//! ├─────────────────────────────────────────────────┤
//! │  MessageQueue: resize / push / pop / stats      │
//! ├────────────────────────┬────────────────────────┤
//! │  Monitor + CancelToken │  Framed RingStorage    │
//! └────────────────────────┴────────────────────────┘
//! ```

// Core modules
pub mod boundary;
pub mod error;
pub mod framing;
pub mod queue;
pub mod sync;

// Control plane and endpoints
pub mod control;
pub mod endpoint;

#[cfg(feature = "c-api")]
pub mod ffi;

// Main API re-exports
pub use boundary::{ByteSink, ByteSource, SliceSink, VecSink};
pub use control::{ControlCode, ControlRequest, ControlResponse, QueueDevice, Session};
pub use endpoint::{QueueClient, QueueServer};
pub use error::{QueueError, Result};
pub use framing::{message_types, FrameHeader, Message, RingStorage, HEADER_SIZE};
pub use queue::{MessageQueue, QueueConfig, QueueStats, StatsSnapshot};
pub use sync::{CancelToken, Monitor, WaitCondition};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 3;
pub const VERSION_PATCH: u32 = 0;

/// Default configuration constants
pub mod config {
    /// Name of the default queue
    pub const DEFAULT_QUEUE_NAME: &str = "queue_driver";

    /// Capacity the configurator sets when none is given
    pub const DEFAULT_CAPACITY: u32 = 64;

    /// Receive buffer the reader and worker tools allocate
    pub const DEFAULT_RECEIVE_CAPACITY: u32 = 256;

    /// Largest capacity a resize may allocate by default (16MB)
    pub const DEFAULT_MAX_CAPACITY: u32 = 16 * 1024 * 1024;

    /// Largest control frame accepted on the wire
    pub const MAX_FRAME_SIZE: usize = DEFAULT_MAX_CAPACITY as usize + 1024;

    /// Default path of the endpoint socket
    pub const DEFAULT_SOCKET_PATH: &str = "/tmp/typedq.sock";
}

//! C Foreign Function Interface (FFI)
//!
//! Handle-based C API over [`MessageQueue`](crate::MessageQueue). Control
//! requests go through `typedq_ioctl` with the same request numbers and
//! argument layouts as the queue device's ioctl interface.

pub mod queue;
pub mod types;
pub mod utils;
pub mod version;

pub use types::{TypedqData, TypedqErrorCode, TypedqQueueHandle, TypedqStats};

pub use utils::{typedq_free_string, HandleRegistry, QueueHandle, HANDLE_REGISTRY};

// Queue API
pub use queue::{
    typedq_ioctl, typedq_queue_create, typedq_queue_destroy, typedq_queue_interrupt,
    typedq_queue_stats,
};

// Version API
pub use version::{typedq_version_major, typedq_version_minor, typedq_version_patch, typedq_version_string};

//! Error types and handling for typedq

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Error types returned by the queue, its control plane and its endpoints
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Copy across the caller boundary failed (bad pointer, short buffer, ...)
    #[error("Fault: {message}")]
    Fault { message: String },

    /// Storage for the requested capacity could not be allocated
    #[error("Out of memory: could not allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    /// A message can never fit the queue, or does not fit the receive buffer
    #[error("Message too large: requires {required} bytes, {available} available")]
    MessageTooLarge { required: usize, available: usize },

    /// A parked caller was cancelled before its wait condition held
    #[error("Interrupted while waiting for {waiting_for}")]
    Interrupted { waiting_for: String },

    /// Unrecognized control code
    #[error("Invalid operation: control code {code:#x}")]
    InvalidOperation { code: u64 },

    /// Non-blocking call could not proceed without waiting
    #[error("Operation would block: {operation}")]
    WouldBlock { operation: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// I/O related errors (socket operations, polling, ...)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Malformed frame or unexpected response on the control wire
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl QueueError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a fault error
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    /// Create an out of memory error
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }

    /// Create a message too large error
    pub fn message_too_large(required: usize, available: usize) -> Self {
        Self::MessageTooLarge {
            required,
            available,
        }
    }

    /// Create an interrupted error
    pub fn interrupted(waiting_for: impl Into<String>) -> Self {
        Self::Interrupted {
            waiting_for: waiting_for.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(code: u64) -> Self {
        Self::InvalidOperation { code }
    }

    /// Create a would block error
    pub fn would_block(operation: impl Into<String>) -> Self {
        Self::WouldBlock {
            operation: operation.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Positive errno value an ioctl caller sees for this error
    pub fn errno(&self) -> i32 {
        match self {
            Self::Fault { .. } => libc::EFAULT,
            Self::OutOfMemory { .. } => libc::ENOMEM,
            Self::MessageTooLarge { .. } => libc::EMSGSIZE,
            Self::Interrupted { .. } => libc::EINTR,
            Self::InvalidOperation { .. } | Self::InvalidParameter { .. } => libc::EINVAL,
            Self::WouldBlock { .. } => libc::EAGAIN,
            Self::Io { .. } | Self::Serialization { .. } => libc::EIO,
            Self::Protocol { .. } => libc::EPROTO,
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<bincode::Error> for QueueError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(format!("Bincode error: {}", err))
    }
}

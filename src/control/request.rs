//! Control requests, responses and their wire form of errors

use serde::{Deserialize, Serialize};

use crate::{
    error::{QueueError, Result},
    framing::Message,
    queue::StatsSnapshot,
};

use super::codes::ControlCode;

/// One control-plane call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlRequest {
    /// Replace the storage; buffered messages are lost
    SetCapacity { capacity: u32 },
    /// Append a message, blocking for space
    Push { msg_type: i32, payload: Vec<u8> },
    /// Remove the oldest message, blocking for data
    Pop { max_len: u32 },
    /// Read the counters
    Stats,
}

impl ControlRequest {
    pub fn code(&self) -> ControlCode {
        match self {
            ControlRequest::SetCapacity { .. } => ControlCode::SetCapacity,
            ControlRequest::Push { .. } => ControlCode::Push,
            ControlRequest::Pop { .. } => ControlCode::Pop,
            ControlRequest::Stats => ControlCode::Stats,
        }
    }
}

/// Result of a control-plane call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlResponse {
    Done,
    Message(Message),
    Stats(StatsSnapshot),
    Error(WireError),
}

impl ControlResponse {
    /// Fold an operation result into a response
    pub fn from_result(result: Result<ControlResponse>) -> Self {
        match result {
            Ok(response) => response,
            Err(e) => ControlResponse::Error(WireError::from(&e)),
        }
    }

    /// Unfold a response, turning `Error` back into a `QueueError`
    pub fn into_result(self) -> Result<ControlResponse> {
        match self {
            ControlResponse::Error(e) => Err(e.into()),
            other => Ok(other),
        }
    }
}

/// Serializable mirror of [`QueueError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireError {
    Fault { message: String },
    OutOfMemory { requested: u64 },
    MessageTooLarge { required: u64, available: u64 },
    Interrupted { waiting_for: String },
    InvalidOperation { code: u64 },
    WouldBlock { operation: String },
    InvalidParameter { parameter: String, message: String },
    Io { message: String },
    Serialization { message: String },
    Protocol { message: String },
}

impl From<&QueueError> for WireError {
    fn from(err: &QueueError) -> Self {
        match err {
            QueueError::Fault { message } => WireError::Fault {
                message: message.clone(),
            },
            QueueError::OutOfMemory { requested } => WireError::OutOfMemory {
                requested: *requested as u64,
            },
            QueueError::MessageTooLarge {
                required,
                available,
            } => WireError::MessageTooLarge {
                required: *required as u64,
                available: *available as u64,
            },
            QueueError::Interrupted { waiting_for } => WireError::Interrupted {
                waiting_for: waiting_for.clone(),
            },
            QueueError::InvalidOperation { code } => WireError::InvalidOperation { code: *code },
            QueueError::WouldBlock { operation } => WireError::WouldBlock {
                operation: operation.clone(),
            },
            QueueError::InvalidParameter { parameter, message } => WireError::InvalidParameter {
                parameter: parameter.clone(),
                message: message.clone(),
            },
            QueueError::Io { message, .. } => WireError::Io {
                message: message.clone(),
            },
            QueueError::Serialization { message } => WireError::Serialization {
                message: message.clone(),
            },
            QueueError::Protocol { message } => WireError::Protocol {
                message: message.clone(),
            },
        }
    }
}

impl From<WireError> for QueueError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Fault { message } => QueueError::fault(message),
            WireError::OutOfMemory { requested } => QueueError::out_of_memory(requested as usize),
            WireError::MessageTooLarge {
                required,
                available,
            } => QueueError::message_too_large(required as usize, available as usize),
            WireError::Interrupted { waiting_for } => QueueError::interrupted(waiting_for),
            WireError::InvalidOperation { code } => QueueError::invalid_operation(code),
            WireError::WouldBlock { operation } => QueueError::would_block(operation),
            WireError::InvalidParameter { parameter, message } => {
                QueueError::invalid_parameter(parameter, message)
            }
            WireError::Io { message } => QueueError::Io {
                message,
                source: None,
            },
            WireError::Serialization { message } => QueueError::serialization(message),
            WireError::Protocol { message } => QueueError::protocol(message),
        }
    }
}

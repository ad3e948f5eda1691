//! FFI functions for queue handles and the ioctl-style control entry point
//!
//! # Thread Safety
//! Handles may be shared across threads. Blocking calls on one handle park
//! their own thread only; `typedq_queue_interrupt` releases them.

use std::{
    ffi::{c_int, c_ulong, c_void},
    ptr::null_mut,
    sync::Arc,
};

use crate::{
    boundary::{ByteSink, ByteSource},
    control::{ControlCode, QueueData},
    error::{QueueError, Result},
    queue::{MessageQueue, QueueConfig},
};

use super::{
    types::{TypedqErrorCode, TypedqQueueHandle, TypedqStats},
    utils::{lookup, registry, QueueHandle},
};

/// Caller memory read during a push
struct UserSource {
    ptr: *const u8,
    len: usize,
}

impl ByteSource for UserSource {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_to(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        if self.ptr.is_null() || offset + dst.len() > self.len {
            return Err(QueueError::fault("bad payload address"));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.add(offset), dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }
}

/// Caller memory written during a pop
struct UserSink {
    ptr: *mut u8,
    capacity: usize,
}

impl ByteSink for UserSink {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn copy_from(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        if self.ptr.is_null() || offset + src.len() > self.capacity {
            return Err(QueueError::fault("bad receive address"));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.add(offset), src.len());
        }
        Ok(())
    }
}

fn non_negative(value: c_int, parameter: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| QueueError::invalid_parameter(parameter, format!("negative value {}", value)))
}

/// Create a queue with `capacity` bytes of storage (0 for none).
///
/// # Returns
/// - Valid handle on success
/// - Null pointer on allocation failure
#[no_mangle]
pub extern "C" fn typedq_queue_create(capacity: u32) -> TypedqQueueHandle {
    let config = QueueConfig::default().with_initial_capacity(capacity);
    match MessageQueue::new(config) {
        Ok(queue) => {
            let id = registry().store_queue(Arc::new(QueueHandle::new(queue)));
            id as TypedqQueueHandle
        }
        Err(_) => null_mut(),
    }
}

/// Destroy a queue; calls still parked on it return `-EINTR`
#[no_mangle]
pub extern "C" fn typedq_queue_destroy(handle: TypedqQueueHandle) -> TypedqErrorCode {
    if handle.is_null() {
        return TypedqErrorCode::InvalidParameter;
    }

    let removed = registry().remove_queue(handle as usize);
    match removed {
        Some(queue) => {
            queue.interrupt();
            TypedqErrorCode::Success
        }
        None => TypedqErrorCode::UnknownHandle,
    }
}

/// Interrupt every call currently parked on `handle`
#[no_mangle]
pub extern "C" fn typedq_queue_interrupt(handle: TypedqQueueHandle) -> TypedqErrorCode {
    match lookup(handle) {
        Some(queue) => {
            queue.interrupt();
            TypedqErrorCode::Success
        }
        None => TypedqErrorCode::UnknownHandle,
    }
}

/// Fill `stats` with a snapshot of the queue counters
#[no_mangle]
pub extern "C" fn typedq_queue_stats(handle: TypedqQueueHandle, stats: *mut TypedqStats) -> TypedqErrorCode {
    if stats.is_null() {
        return TypedqErrorCode::InvalidParameter;
    }
    let Some(queue) = lookup(handle) else {
        return TypedqErrorCode::UnknownHandle;
    };

    unsafe {
        *stats = queue.queue.stats().into();
    }
    TypedqErrorCode::Success
}

/// Issue a control request against `handle`.
///
/// `arg` points at an `int` for `SET_SIZE_OF_QUEUE`, a `struct data` for
/// `PUSH_DATA`/`POP_DATA` and a stats struct for `QUEUE_STATS`.
///
/// # Returns
/// `0` on success, otherwise a negative errno (`-EFAULT`, `-ENOMEM`,
/// `-EMSGSIZE`, `-EINTR`, `-EINVAL`, `-EBADF` for an unknown handle).
#[no_mangle]
pub extern "C" fn typedq_ioctl(handle: TypedqQueueHandle, request: c_ulong, arg: *mut c_void) -> c_int {
    let Some(queue) = lookup(handle) else {
        return -libc::EBADF;
    };

    match ControlCode::from_raw(request as u64).and_then(|code| control(&queue, code, arg)) {
        Ok(()) => 0,
        Err(e) => -e.errno(),
    }
}

fn control(handle: &QueueHandle, code: ControlCode, arg: *mut c_void) -> Result<()> {
    if arg.is_null() {
        return Err(QueueError::fault(format!("null argument to {}", code.name())));
    }

    match code {
        ControlCode::SetCapacity => {
            let size = unsafe { *(arg as *const c_int) };
            let capacity = non_negative(size, "size")?;
            handle.queue.resize(capacity as u32)
        }
        ControlCode::Push => {
            let data = unsafe { *(arg as *const QueueData) };
            let source = UserSource {
                ptr: data.data as *const u8,
                len: non_negative(data.length, "length")?,
            };
            let token = handle.token();
            handle.queue.push_from(data.msg_type, &source, Some(&token))
        }
        ControlCode::Pop => {
            let data = arg as *mut QueueData;
            let request = unsafe { *data };
            let mut sink = UserSink {
                ptr: request.data as *mut u8,
                capacity: non_negative(request.length, "length")?,
            };
            let token = handle.token();
            let header = handle.queue.pop_into(&mut sink, Some(&token))?;
            unsafe {
                (*data).msg_type = header.msg_type;
                (*data).length = header.length as c_int;
            }
            Ok(())
        }
        ControlCode::Stats => {
            unsafe {
                *(arg as *mut TypedqStats) = handle.queue.stats().into();
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_char;

    #[test]
    fn test_user_source_rejects_null() {
        let source = UserSource {
            ptr: std::ptr::null(),
            len: 4,
        };
        let mut dst = [0u8; 4];
        assert!(matches!(source.copy_to(0, &mut dst), Err(QueueError::Fault { .. })));
        assert!(source.copy_to(0, &mut []).is_ok());
    }

    #[test]
    fn test_set_capacity_rejects_negative() {
        let handle = typedq_queue_create(0);
        let mut size: c_int = -1;
        let rc = typedq_ioctl(handle, ControlCode::SetCapacity.raw() as c_ulong, &mut size as *mut c_int as *mut c_void);
        assert_eq!(rc, -libc::EINVAL);
        assert_eq!(typedq_queue_destroy(handle), TypedqErrorCode::Success);
    }

    #[test]
    fn test_pop_reports_type_and_length() {
        let handle = typedq_queue_create(64);
        let mut payload = *b"hello";
        let mut push = QueueData {
            msg_type: 100,
            length: 5,
            data: payload.as_mut_ptr() as *mut c_char,
        };
        let rc = typedq_ioctl(handle, ControlCode::Push.raw() as c_ulong, &mut push as *mut QueueData as *mut c_void);
        assert_eq!(rc, 0);

        let mut buf = [0u8; 256];
        let mut pop = QueueData {
            msg_type: 0,
            length: 256,
            data: buf.as_mut_ptr() as *mut c_char,
        };
        let rc = typedq_ioctl(handle, ControlCode::Pop.raw() as c_ulong, &mut pop as *mut QueueData as *mut c_void);
        assert_eq!(rc, 0);
        assert_eq!(pop.msg_type, 100);
        assert_eq!(pop.length, 5);
        assert_eq!(&buf[..5], b"hello");

        typedq_queue_destroy(handle);
    }
}

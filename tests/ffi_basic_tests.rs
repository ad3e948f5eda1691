//! FFI (C API) Integration Tests
//!
//! Drives the queue through `typedq_ioctl` exactly as a C program would,
//! with `struct data` arguments and negative errno results.

#[cfg(feature = "c-api")]
use typedq::{
    control::{ControlCode, QueueData},
    ffi::{
        typedq_free_string, typedq_ioctl, typedq_queue_create, typedq_queue_destroy,
        typedq_queue_interrupt, typedq_queue_stats, typedq_version_major, typedq_version_minor,
        typedq_version_patch, typedq_version_string, TypedqErrorCode, TypedqQueueHandle,
        TypedqStats,
    },
};
use std::ffi::{c_char, c_int, c_ulong, c_void, CStr};
use std::ptr;

#[cfg(feature = "c-api")]
fn ioctl<T>(handle: TypedqQueueHandle, code: ControlCode, arg: &mut T) -> c_int {
    typedq_ioctl(handle, code.raw() as c_ulong, arg as *mut T as *mut c_void)
}

#[cfg(feature = "c-api")]
fn push(handle: TypedqQueueHandle, msg_type: c_int, payload: &mut [u8]) -> c_int {
    let mut d = QueueData {
        msg_type,
        length: payload.len() as c_int,
        data: payload.as_mut_ptr() as *mut c_char,
    };
    ioctl(handle, ControlCode::Push, &mut d)
}

#[cfg(test)]
#[cfg(feature = "c-api")]
mod ffi_tests {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn test_version_information() {
        assert_eq!(typedq_version_major(), typedq::VERSION_MAJOR);
        assert_eq!(typedq_version_minor(), typedq::VERSION_MINOR);
        assert_eq!(typedq_version_patch(), typedq::VERSION_PATCH);

        let version_ptr = typedq_version_string();
        assert!(!version_ptr.is_null());
        let version = unsafe { CStr::from_ptr(version_ptr) }.to_string_lossy().into_owned();
        assert_eq!(version, typedq::VERSION);
        typedq_free_string(version_ptr);
    }

    #[test]
    fn test_configure_fill_and_read() {
        let handle = typedq_queue_create(0);
        assert!(!handle.is_null());

        let mut size: c_int = 64;
        assert_eq!(ioctl(handle, ControlCode::SetCapacity, &mut size), 0);

        let mut line = *b"first line\n";
        assert_eq!(push(handle, 100, &mut line), 0);

        let mut buf = vec![0u8; 256];
        let mut d = QueueData {
            msg_type: 0,
            length: 256,
            data: buf.as_mut_ptr() as *mut c_char,
        };
        assert_eq!(ioctl(handle, ControlCode::Pop, &mut d), 0);
        assert_eq!(d.msg_type, 100);
        assert_eq!(d.length, 11);
        assert_eq!(&buf[..11], b"first line\n");

        let mut stats = TypedqStats::default();
        assert_eq!(ioctl(handle, ControlCode::Stats, &mut stats), 0);
        assert_eq!(stats.capacity_bytes, 64);
        assert_eq!(stats.total_pushes, 1);
        assert_eq!(stats.total_pops, 1);

        assert_eq!(typedq_queue_destroy(handle), TypedqErrorCode::Success);
    }

    #[test]
    fn test_errno_results() {
        let handle = typedq_queue_create(32);

        // Unknown request number
        let mut dummy: c_int = 0;
        assert_eq!(typedq_ioctl(handle, 0xdead, &mut dummy as *mut c_int as *mut c_void), -libc::EINVAL);

        // Null argument
        assert_eq!(
            typedq_ioctl(handle, ControlCode::SetCapacity.raw() as c_ulong, ptr::null_mut()),
            -libc::EFAULT
        );

        // Null payload pointer with a non-zero length
        let mut d = QueueData {
            msg_type: 100,
            length: 4,
            data: ptr::null_mut(),
        };
        assert_eq!(ioctl(handle, ControlCode::Push, &mut d), -libc::EFAULT);

        // Frame that can never fit
        let mut big = [0u8; 32];
        assert_eq!(push(handle, 100, &mut big), -libc::EMSGSIZE);

        // Receive buffer smaller than the message
        let mut small = *b"0123456789";
        assert_eq!(push(handle, 100, &mut small), 0);
        let mut buf = [0u8; 4];
        let mut d = QueueData {
            msg_type: 0,
            length: 4,
            data: buf.as_mut_ptr() as *mut c_char,
        };
        assert_eq!(ioctl(handle, ControlCode::Pop, &mut d), -libc::EMSGSIZE);

        // Faulting receive buffer leaves the message queued
        let mut d = QueueData {
            msg_type: 0,
            length: 64,
            data: ptr::null_mut(),
        };
        assert_eq!(ioctl(handle, ControlCode::Pop, &mut d), -libc::EFAULT);

        let mut stats = TypedqStats::default();
        assert_eq!(typedq_queue_stats(handle, &mut stats), TypedqErrorCode::Success);
        assert_eq!(stats.used_bytes, 18);
        assert_eq!(stats.total_pops, 0);

        typedq_queue_destroy(handle);
    }

    #[test]
    fn test_unknown_handle() {
        let bogus = usize::MAX as TypedqQueueHandle;
        let mut size: c_int = 64;
        assert_eq!(ioctl(bogus, ControlCode::SetCapacity, &mut size), -libc::EBADF);
        assert_eq!(typedq_queue_destroy(bogus), TypedqErrorCode::UnknownHandle);
        assert_eq!(typedq_queue_destroy(ptr::null_mut()), TypedqErrorCode::InvalidParameter);
    }

    #[test]
    fn test_interrupt_releases_parked_pop() {
        let handle = typedq_queue_create(64);
        let raw = handle as usize;

        let reader = thread::spawn(move || {
            let mut buf = [0u8; 256];
            let mut d = QueueData {
                msg_type: 0,
                length: 256,
                data: buf.as_mut_ptr() as *mut c_char,
            };
            ioctl(raw as TypedqQueueHandle, ControlCode::Pop, &mut d)
        });

        let mut stats = TypedqStats::default();
        loop {
            typedq_queue_stats(handle, &mut stats);
            if stats.blocked_readers == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(typedq_queue_interrupt(handle), TypedqErrorCode::Success);
        assert_eq!(reader.join().unwrap(), -libc::EINTR);

        // Later calls block normally again; a ready pop succeeds
        let mut line = *b"after\n";
        assert_eq!(push(handle, 100, &mut line), 0);
        let mut buf = [0u8; 16];
        let mut d = QueueData {
            msg_type: 0,
            length: 16,
            data: buf.as_mut_ptr() as *mut c_char,
        };
        assert_eq!(ioctl(handle, ControlCode::Pop, &mut d), 0);

        typedq_queue_destroy(handle);
    }
}

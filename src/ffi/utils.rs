//! FFI utilities and handle management

use std::{
    collections::HashMap,
    ffi::{c_char, CString},
    sync::{Arc, Mutex, PoisonError},
};

use crate::{queue::MessageQueue, sync::CancelToken};

use super::types::TypedqQueueHandle;

// Global handle management
lazy_static::lazy_static! {
    pub static ref HANDLE_REGISTRY: Mutex<HandleRegistry> = Mutex::new(HandleRegistry::new());
}

/// Lock the registry, recovering from a poisoned lock
pub fn registry() -> std::sync::MutexGuard<'static, HandleRegistry> {
    HANDLE_REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A queue owned by the C API together with its interruption token
pub struct QueueHandle {
    pub queue: Arc<MessageQueue>,
    cancel: Mutex<CancelToken>,
}

impl QueueHandle {
    pub fn new(queue: MessageQueue) -> Self {
        Self {
            queue: Arc::new(queue),
            cancel: Mutex::new(CancelToken::new()),
        }
    }

    /// Token the next blocking call parks with
    pub fn token(&self) -> CancelToken {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Interrupt every call currently parked on this handle.
    ///
    /// Later calls get a fresh token and block normally.
    pub fn interrupt(&self) {
        let previous = {
            let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *cancel)
        };
        previous.cancel();
    }
}

pub struct HandleRegistry {
    queues: HashMap<usize, Arc<QueueHandle>>,
    next_id: usize,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn store_queue(&mut self, handle: Arc<QueueHandle>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.queues.insert(id, handle);
        id
    }

    pub fn get_queue(&self, id: usize) -> Option<Arc<QueueHandle>> {
        self.queues.get(&id).cloned()
    }

    pub fn remove_queue(&mut self, id: usize) -> Option<Arc<QueueHandle>> {
        self.queues.remove(&id)
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a C handle without keeping the registry locked
pub fn lookup(handle: TypedqQueueHandle) -> Option<Arc<QueueHandle>> {
    if handle.is_null() {
        return None;
    }
    registry().get_queue(handle as usize)
}

/// Convert Rust String to C string (caller must free with typedq_free_string)
pub fn string_to_c_str(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a string returned by the C API
#[no_mangle]
pub extern "C" fn typedq_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

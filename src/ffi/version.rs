//! Library version as seen from C
//!
//! C callers compare these against the header they were built with before
//! relying on the `struct data` layout or the request numbers.

use std::ffi::c_char;

use super::utils::string_to_c_str;

/// Major version; a change here means the request numbers or argument
/// layouts changed
#[no_mangle]
pub extern "C" fn typedq_version_major() -> u32 {
    crate::VERSION_MAJOR
}

#[no_mangle]
pub extern "C" fn typedq_version_minor() -> u32 {
    crate::VERSION_MINOR
}

#[no_mangle]
pub extern "C" fn typedq_version_patch() -> u32 {
    crate::VERSION_PATCH
}

/// `"MAJOR.MINOR.PATCH"`, owned by the caller; release with `typedq_free_string`
#[no_mangle]
pub extern "C" fn typedq_version_string() -> *mut c_char {
    string_to_c_str(format!(
        "{}.{}.{}",
        crate::VERSION_MAJOR,
        crate::VERSION_MINOR,
        crate::VERSION_PATCH
    ))
}

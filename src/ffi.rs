use libc::size_t;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::slice;

use crate::{RangeError, RangeWriter};

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(non_camel_case_types)]
pub enum KhandaErrorCode {
    KHANDA_SUCCESS = 0,
    KHANDA_OUT_OF_BOUNDS = 1,
    KHANDA_NO_PROGRESS = 2,
    KHANDA_PREMATURE_EOF = 3,
    KHANDA_IO = 4,
    KHANDA_WRITER_CLOSED = 5,
    KHANDA_INVALID_ARGUMENT = 6,
    KHANDA_UNKNOWN = 99,
}

impl From<&RangeError> for KhandaErrorCode {
    fn from(err: &RangeError) -> Self {
        match err {
            RangeError::OutOfBounds(_) => KhandaErrorCode::KHANDA_OUT_OF_BOUNDS,
            RangeError::NoProgress(_) => KhandaErrorCode::KHANDA_NO_PROGRESS,
            RangeError::PrematureEof(_) => KhandaErrorCode::KHANDA_PREMATURE_EOF,
            RangeError::Io(_) => KhandaErrorCode::KHANDA_IO,
            RangeError::WriterClosed => KhandaErrorCode::KHANDA_WRITER_CLOSED,
        }
    }
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<(KhandaErrorCode, CString)>> =
        const { std::cell::RefCell::new(None) };
}

fn set_last_error(err: &RangeError) {
    let error_msg = CString::new(err.to_string())
        .unwrap_or_else(|_| CString::new("Failed to format error message").unwrap());
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((KhandaErrorCode::from(err), error_msg));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Opaque range writer handle
pub struct KhandaWriter {
    inner: Box<dyn RangeWriter>,
}

/// Get the last error message for this thread
/// Returns NULL if no error
/// The returned string is valid until the next khanda call on this thread
#[unsafe(no_mangle)]
pub extern "C" fn khanda_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, s)| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Get the error code for the last error on this thread
/// Returns KHANDA_SUCCESS if no error
#[unsafe(no_mangle)]
pub extern "C" fn khanda_last_error_code() -> KhandaErrorCode {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code)
            .unwrap_or(KhandaErrorCode::KHANDA_SUCCESS)
    })
}

/// Create a range writer over a file path
/// Returns NULL on error
///
/// # Safety
/// >> path must be a valid null-terminated C string
/// >> Caller must free the returned pointer with khanda_writer_close()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn khanda_writer_from_path(path: *const c_char) -> *mut KhandaWriter {
    clear_last_error();

    if path.is_null() {
        set_last_error(&RangeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path is null",
        )));
        return ptr::null_mut();
    }

    let path_str = unsafe {
        match CStr::from_ptr(path).to_str() {
            Ok(s) => s,
            Err(_) => {
                set_last_error(&RangeError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Invalid UTF-8 in path",
                )));
                return ptr::null_mut();
            }
        }
    };

    let writer = crate::for_path(path_str);
    Box::into_raw(Box::new(KhandaWriter { inner: writer }))
}

/// Create a range writer over a copy of an in-memory buffer
/// Returns NULL on error
///
/// # Safety
/// >> data must be valid for reads of len bytes (or NULL when len is 0)
/// >> Caller must free the returned pointer with khanda_writer_close()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn khanda_writer_from_bytes(
    data: *const c_void,
    len: size_t,
) -> *mut KhandaWriter {
    clear_last_error();

    if data.is_null() && len != 0 {
        set_last_error(&RangeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Data is null",
        )));
        return ptr::null_mut();
    }

    let bytes = if len == 0 {
        &[][..]
    } else {
        unsafe { slice::from_raw_parts(data as *const u8, len) }
    };

    let writer = crate::for_bytes(bytes);
    Box::into_raw(Box::new(KhandaWriter { inner: writer }))
}

/// Write the range [offset, offset + length) of the source into buffer
/// Returns length on success, or -1 on error
///
/// # Safety
/// >> writer must be a valid writer handle
/// >> buffer must be valid for writes of at least length bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn khanda_write_range(
    writer: *mut KhandaWriter,
    offset: u64,
    buffer: *mut c_void,
    length: size_t,
) -> isize {
    clear_last_error();

    if writer.is_null() || (buffer.is_null() && length != 0) {
        set_last_error(&RangeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Null pointer argument",
        )));
        return -1;
    }

    if length == 0 {
        return 0;
    }

    let writer_ref = unsafe { &mut *writer };
    let buf = unsafe { slice::from_raw_parts_mut(buffer as *mut u8, length) };
    let mut out = &mut buf[..];

    match writer_ref.inner.write_to(&mut out, offset, length as u64) {
        Ok(()) => length as isize,
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Close a writer and free its resources
///
/// # Safety
/// >> writer must be a valid writer handle or NULL
/// >> writer must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn khanda_writer_close(writer: *mut KhandaWriter) {
    if !writer.is_null() {
        let mut writer_box = unsafe { Box::from_raw(writer) };
        if let Err(e) = writer_box.inner.close() {
            set_last_error(&e);
        }
    }
}

/// Get library version string
/// Returns pointer to static version string
#[unsafe(no_mangle)]
pub extern "C" fn khanda_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

use std::ptr;
use std::slice;

use crate::ffi::api::native_api;
use crate::ffi::status::{CALL_SUCCESS, RawCallStatus};

/// Byte buffer allocated and owned by the native side. The triple mirrors
/// the native allocator's bookkeeping; only `len` bytes of `data` are
/// meaningful.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct RawBuffer {
    pub capacity: u64,
    pub len: u64,
    pub data: *mut u8,
}

impl RawBuffer {
    pub const fn empty() -> Self {
        Self {
            capacity: 0,
            len: 0,
            data: ptr::null_mut(),
        }
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_null()
    }
}

impl Default for RawBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

/// Borrowed view of binding-side memory handed to the native copy-in entry
/// point. The pointee must stay alive for the duration of that one call.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ForeignBytes {
    pub len: i32,
    pub data: *const u8,
}

/// Owning wrapper around a [`RawBuffer`]. Every native-owned buffer is freed
/// exactly once, through the native free entry point, when this wrapper is
/// dropped; [`NativeBuffer::into_raw`] forfeits ownership to a native call
/// instead.
#[derive(Debug)]
pub struct NativeBuffer {
    raw: RawBuffer,
}

impl NativeBuffer {
    /// Takes ownership of a buffer returned by a native call.
    pub fn from_raw(raw: RawBuffer) -> Self {
        Self { raw }
    }

    /// Asks the native side to copy `bytes` into a buffer it owns. Local
    /// memory is never handed to the native side for later freeing, and
    /// vice versa.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::from_raw(RawBuffer::empty());
        }
        let len = i32::try_from(bytes.len()).unwrap_or_else(|_| {
            panic!(
                "buffer of {} bytes exceeds the 32-bit signed length range",
                bytes.len()
            )
        });
        let foreign = ForeignBytes {
            len,
            data: bytes.as_ptr(),
        };
        let api = native_api();
        let raw = crate::ffi::status::native_call(|status| unsafe {
            (api.buffer_from_bytes)(foreign, status)
        });
        Self::from_raw(raw)
    }

    pub fn as_slice(&self) -> &[u8] {
        if self.raw.data.is_null() {
            return &[];
        }
        // Valid for `len` bytes per the native buffer contract.
        unsafe { slice::from_raw_parts(self.raw.data, self.raw.len as usize) }
    }

    pub fn len(&self) -> u64 {
        self.raw.len
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Releases ownership; the raw buffer is now the native side's to free.
    pub fn into_raw(self) -> RawBuffer {
        let raw = self.raw;
        std::mem::forget(self);
        raw
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        if !self.raw.is_allocated() {
            return;
        }
        free_raw(self.raw);
    }
}

pub(crate) fn free_raw(raw: RawBuffer) {
    let api = native_api();
    let mut status = RawCallStatus::new();
    unsafe { (api.buffer_free)(raw, &mut status) };
    if status.code != CALL_SUCCESS {
        if std::thread::panicking() {
            tracing::error!(code = status.code, "native buffer free failed during unwind");
        } else {
            panic!("unexpected status {} freeing native buffer", status.code);
        }
    }
}

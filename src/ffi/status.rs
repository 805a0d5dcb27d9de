use std::convert::Infallible;

use crate::codec::Codec;
use crate::codec::primitives::Str;
use crate::ffi::buffer::{NativeBuffer, RawBuffer};

pub const CALL_SUCCESS: i8 = 0;
pub const CALL_ERROR: i8 = 1;
pub const CALL_PANIC: i8 = 2;

/// Out-parameter every fallible native entry point fills in: `0` success,
/// `1` expected error (`error_buf` holds the serialized error), `2` native
/// panic (`error_buf` holds a serialized message string).
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct RawCallStatus {
    pub code: i8,
    pub error_buf: RawBuffer,
}

impl RawCallStatus {
    pub const fn new() -> Self {
        Self {
            code: CALL_SUCCESS,
            error_buf: RawBuffer::empty(),
        }
    }
}

impl Default for RawCallStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Invokes a native entry point that is not declared to fail. An expected
/// error surfacing here is a contract violation; a native panic is always
/// fatal on the binding side.
pub fn native_call<T>(f: impl FnOnce(&mut RawCallStatus) -> T) -> T {
    let mut status = RawCallStatus::new();
    let value = f(&mut status);
    match consume_status(status, |buf| -> Infallible {
        drop(buf);
        panic!("native call reported an expected error at an infallible call site");
    }) {
        Ok(()) => value,
        Err(never) => match never {},
    }
}

/// Invokes a fallible native entry point, lifting an expected error through
/// the call's declared error codec. Native panics stay panics; they are
/// never folded into the typed error.
pub fn native_call_with_error<T, E>(
    error_codec: &impl Codec<Value = E>,
    f: impl FnOnce(&mut RawCallStatus) -> T,
) -> Result<T, E> {
    let mut status = RawCallStatus::new();
    let value = f(&mut status);
    consume_status(status, |buf| error_codec.lift(buf)).map(|()| value)
}

/// Applies the tri-state convention to a filled-in status, taking ownership
/// of the error payload buffer.
pub(crate) fn consume_status<E>(
    status: RawCallStatus,
    lift_error: impl FnOnce(NativeBuffer) -> E,
) -> Result<(), E> {
    match status.code {
        CALL_SUCCESS => Ok(()),
        CALL_ERROR => Err(lift_error(NativeBuffer::from_raw(status.error_buf))),
        CALL_PANIC => {
            let buffer = NativeBuffer::from_raw(status.error_buf);
            let message = if buffer.is_empty() {
                drop(buffer);
                "native library panicked without a message".to_owned()
            } else {
                Str.lift(buffer)
            };
            panic!("native library panicked: {message}");
        }
        other => panic!("invalid native call status code {other}"),
    }
}

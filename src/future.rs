//! Async call bridge: drives a native poll-based future to completion from
//! a single blocking call.
//!
//! The native contract only exposes "poll me again" semantics, so the
//! bridge is deliberately a cooperative poll loop over a one-shot channel
//! rather than an integration with any reactor. Each poll round registers a
//! fresh handle in the continuation table, invokes the native poll entry
//! point with it, and blocks until the process-wide continuation callback
//! delivers exactly one signal for that round. Stale signals can never
//! reach a newer round, and a signal for an abandoned round is discarded by
//! the buffered, non-blocking send.

use std::convert::Infallible;
use std::ffi::c_void;

use crossbeam_channel::{Sender, bounded};
use once_cell::sync::Lazy;
use tracing::trace;

use crate::codec::Codec;
use crate::ffi::buffer::NativeBuffer;
use crate::ffi::status::{CALL_SUCCESS, RawCallStatus, consume_status};
use crate::handles::HandleMap;

/// Poll result byte: the only two values the native side may deliver.
pub const POLL_READY: i8 = 0;
pub const POLL_MAYBE_READY: i8 = 1;

static CONTINUATIONS: Lazy<HandleMap<Sender<i8>>> =
    Lazy::new(|| HandleMap::new("future-continuation"));

/// The single process-wide continuation entry point, registered with the
/// native library once during initialization. It looks up the poll round's
/// channel and delivers the result; no business logic.
pub extern "C" fn future_continuation(handle: u64, poll_result: i8) {
    let Some(sender) = CONTINUATIONS.remove(handle) else {
        panic!("no continuation registered for future handle {handle}");
    };
    if sender.try_send(poll_result).is_err() {
        trace!(handle, "poll signal arrived after the waiter was abandoned");
    }
}

/// Drives an async native call that is not declared to fail. Any error
/// status from the native side is fatal here.
pub fn call_async<T>(
    start: impl FnOnce(&mut RawCallStatus) -> *mut c_void,
    poll: impl FnMut(*mut c_void, u64, &mut RawCallStatus),
    complete: impl FnOnce(*mut c_void, &mut RawCallStatus) -> T,
    free: impl Fn(*mut c_void, &mut RawCallStatus),
) -> T {
    let result = drive(start, poll, complete, free, |buffer| -> Infallible {
        drop(buffer);
        panic!("async native call reported an expected error at an infallible call site");
    });
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Drives a fallible async native call, lifting expected errors through the
/// call's declared error codec at every stage (start, poll, complete).
pub fn call_async_with_error<T, E>(
    error_codec: &impl Codec<Value = E>,
    start: impl FnOnce(&mut RawCallStatus) -> *mut c_void,
    poll: impl FnMut(*mut c_void, u64, &mut RawCallStatus),
    complete: impl FnOnce(*mut c_void, &mut RawCallStatus) -> T,
    free: impl Fn(*mut c_void, &mut RawCallStatus),
) -> Result<T, E> {
    drive(start, poll, complete, free, |buffer| error_codec.lift(buffer))
}

fn drive<T, E>(
    start: impl FnOnce(&mut RawCallStatus) -> *mut c_void,
    mut poll: impl FnMut(*mut c_void, u64, &mut RawCallStatus),
    complete: impl FnOnce(*mut c_void, &mut RawCallStatus) -> T,
    free: impl Fn(*mut c_void, &mut RawCallStatus),
    lift_error: impl Fn(NativeBuffer) -> E,
) -> Result<T, E> {
    let mut status = RawCallStatus::new();
    let future = start(&mut status);
    // A start failure never entered polling; there is no future to free.
    consume_status(status, &lift_error)?;

    let _free_guard = FreeOnDrop {
        future,
        free: &free,
    };

    loop {
        let (sender, receiver) = bounded(1);
        let handle = CONTINUATIONS.insert(sender);
        let mut status = RawCallStatus::new();
        poll(future, handle, &mut status);
        if let Err(err) = consume_status(status, &lift_error) {
            // The native side will not signal a failed poll.
            CONTINUATIONS.remove(handle);
            return Err(err);
        }
        match receiver.recv() {
            Ok(POLL_READY) => break,
            Ok(POLL_MAYBE_READY) => trace!(handle, "future not ready; polling again"),
            Ok(other) => panic!("invalid poll result byte {other}"),
            Err(_) => panic!("future continuation dropped without delivering a signal"),
        }
    }

    let mut status = RawCallStatus::new();
    let value = complete(future, &mut status);
    consume_status(status, &lift_error).map(|()| value)
}

/// Frees the native future exactly once, on normal completion, typed error,
/// and unwind alike.
struct FreeOnDrop<'a, F: Fn(*mut c_void, &mut RawCallStatus)> {
    future: *mut c_void,
    free: &'a F,
}

impl<F: Fn(*mut c_void, &mut RawCallStatus)> Drop for FreeOnDrop<'_, F> {
    fn drop(&mut self) {
        let mut status = RawCallStatus::new();
        (self.free)(self.future, &mut status);
        if status.code != CALL_SUCCESS {
            if std::thread::panicking() {
                tracing::error!(code = status.code, "native future free failed during unwind");
            } else {
                panic!("unexpected status {} freeing native future", status.code);
            }
        }
    }
}

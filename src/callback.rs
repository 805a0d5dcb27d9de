//! Dispatch runtime for foreign-implemented interfaces invoked from the
//! native side.
//!
//! Implementations register in a per-interface handle table; the handle is
//! what crosses into native code, never a language pointer. The generated
//! vtable shim for each interface decodes arguments, invokes the method,
//! and reports through [`complete_dispatch`]'s tri-state convention.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Sender, bounded, select};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::codec::primitives::Str;
use crate::codec::{Codec, Reader, Writer};
use crate::ffi::buffer::RawBuffer;
use crate::ffi::status::RawCallStatus;
use crate::handles::HandleMap;

/// Dispatch status codes returned to the native caller.
pub const CALLBACK_SUCCESS: i8 = 0;
pub const CALLBACK_ERROR: i8 = 1;
pub const CALLBACK_UNEXPECTED_ERROR: i8 = 2;

/// Method index 0 is reserved: the native side signals it is done with the
/// handle rather than invoking a real method.
pub const IDX_CALLBACK_FREE: u32 = 0;

/// Per-interface registry of foreign implementations. Handle-table-backed
/// converter: lowering registers and yields the handle, lifting resolves it.
pub struct CallbackRegistry<T: ?Sized> {
    handles: HandleMap<Arc<T>>,
}

impl<T: ?Sized> CallbackRegistry<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            handles: HandleMap::new(label),
        }
    }

    pub fn register(&self, implementation: Arc<T>) -> u64 {
        self.handles.insert(implementation)
    }

    /// Resolves a handle presented by the native side. A miss is fatal: it
    /// means table corruption or a bindings/native version mismatch.
    pub fn get(&self, handle: u64) -> Arc<T> {
        self.handles
            .get(handle)
            .unwrap_or_else(|| panic!("no callback in handle map: {handle}"))
    }

    /// Releases a handle on `IDX_CALLBACK_FREE`; idempotent.
    pub fn drop_handle(&self, handle: u64) {
        self.handles.remove(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<T: ?Sized> Codec for CallbackRegistry<T> {
    type Value = Arc<T>;

    fn write(&self, writer: &mut Writer, value: &Self::Value) {
        writer.write_u64(self.register(Arc::clone(value)));
    }

    fn read(&self, reader: &mut Reader<'_>) -> Self::Value {
        self.get(reader.read_u64())
    }
}

/// Outcome of invoking a foreign method from a vtable shim.
pub enum DispatchOutcome<T, E> {
    Ok(T),
    /// The method raised a value of its declared error type.
    Err(E),
    /// The method raised something outside its declared error type; only a
    /// rendered message crosses the boundary.
    Unexpected(String),
}

/// Encodes a dispatch outcome into the out-buffer and status the native
/// caller reads. On both error paths the out-buffer is left well-formed and
/// empty so the native side never reads uninitialized memory.
pub fn complete_dispatch<T, E>(
    result_codec: &impl Codec<Value = T>,
    error_codec: &impl Codec<Value = E>,
    outcome: DispatchOutcome<T, E>,
    out_return: &mut RawBuffer,
    out_status: &mut RawCallStatus,
) {
    match outcome {
        DispatchOutcome::Ok(value) => {
            *out_return = result_codec.lower(&value).into_raw();
            out_status.code = CALLBACK_SUCCESS;
        }
        DispatchOutcome::Err(error) => {
            *out_return = RawBuffer::empty();
            out_status.code = CALLBACK_ERROR;
            out_status.error_buf = error_codec.lower(&error).into_raw();
        }
        DispatchOutcome::Unexpected(message) => {
            *out_return = RawBuffer::empty();
            out_status.code = CALLBACK_UNEXPECTED_ERROR;
            out_status.error_buf = Str.lower(&message).into_raw();
        }
    }
}

/// Future handed back to the native side when it invokes an async interface
/// method: a cancellation-capable token plus the entry point to release it.
#[repr(C)]
pub struct ForeignFuture {
    pub handle: u64,
    pub free: ForeignFutureFreeFn,
}

pub type ForeignFutureFreeFn = extern "C" fn(handle: u64);

static FOREIGN_FUTURES: Lazy<HandleMap<Sender<()>>> =
    Lazy::new(|| HandleMap::new("foreign-future"));

/// Cancels/releases a foreign future. Idempotent; invoked by the native
/// side through the fn pointer in [`ForeignFuture`].
pub extern "C" fn foreign_future_free(handle: u64) {
    if let Some(cancel) = FOREIGN_FUTURES.remove(handle) {
        let _ = cancel.try_send(());
    }
}

/// Runs an async interface method off the dispatch thread. Returns
/// immediately with a cancellation token; `work` runs on its own thread and
/// `deliver` fires with the result unless cancellation wins the race, in
/// which case the result is discarded.
pub fn start_foreign_future<R>(
    work: impl FnOnce() -> R + Send + 'static,
    deliver: impl FnOnce(R) + Send + 'static,
) -> ForeignFuture
where
    R: Send + 'static,
{
    let (result_sender, result_receiver) = bounded::<R>(1);
    let (cancel_sender, cancel_receiver) = bounded::<()>(1);
    let handle = FOREIGN_FUTURES.insert(cancel_sender);

    thread::Builder::new()
        .name(format!("ferrogen-callback-{handle}"))
        .spawn(move || {
            // The receiver is gone when cancellation already won; the
            // result is simply dropped.
            let _ = result_sender.try_send(work());
        })
        .expect("failed to spawn callback worker");

    thread::Builder::new()
        .name(format!("ferrogen-deliver-{handle}"))
        .spawn(move || {
            select! {
                recv(cancel_receiver) -> _ => {
                    debug!(handle, "foreign future cancelled before completion");
                }
                recv(result_receiver) -> result => {
                    if let Ok(result) = result {
                        FOREIGN_FUTURES.remove(handle);
                        deliver(result);
                    }
                }
            }
        })
        .expect("failed to spawn callback delivery");

    ForeignFuture {
        handle,
        free: foreign_future_free,
    }
}

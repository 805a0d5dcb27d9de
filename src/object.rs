//! Lifecycle management for native-held object references.
//!
//! A [`NativeObject`] wraps the opaque pointer behind a foreign-exposed
//! object together with the native clone/free pair for its type. Calls in
//! flight are counted so that destroy, whether explicit or triggered by
//! the last `Arc` dropping, never frees the native resource out from
//! under a running call; the free happens exactly once, deferred to the
//! last [`CallGuard`] when necessary.

use std::ffi::c_void;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::codec::{Codec, Reader, Writer};
use crate::error::ObjectError;
use crate::ffi::status::{RawCallStatus, native_call};

pub type ObjectCloneFn =
    unsafe extern "C" fn(*const c_void, *mut RawCallStatus) -> *const c_void;
pub type ObjectFreeFn = unsafe extern "C" fn(*const c_void, *mut RawCallStatus);

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    in_flight: u64,
    destroyed: bool,
}

pub struct NativeObject {
    pointer: *const c_void,
    clone_fn: ObjectCloneFn,
    free_fn: ObjectFreeFn,
    lifecycle: Mutex<Lifecycle>,
}

// The pointer is opaque to the binding side; the native clone/free entry
// points are required by contract to be callable from any thread.
unsafe impl Send for NativeObject {}
unsafe impl Sync for NativeObject {}

impl NativeObject {
    /// Takes ownership of a pointer returned by the native side.
    pub fn new(pointer: *const c_void, clone_fn: ObjectCloneFn, free_fn: ObjectFreeFn) -> Arc<Self> {
        Arc::new(Self {
            pointer,
            clone_fn,
            free_fn,
            lifecycle: Mutex::new(Lifecycle {
                in_flight: 0,
                destroyed: false,
            }),
        })
    }

    /// Marks one native call in flight and exposes the raw pointer for its
    /// duration. The guard decrements on every exit path, including native
    /// error returns.
    pub fn begin_call(&self) -> Result<CallGuard<'_>, ObjectError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.destroyed {
            return Err(ObjectError::UseAfterDestroy);
        }
        lifecycle.in_flight += 1;
        Ok(CallGuard { object: self })
    }

    /// Mints a native-owned +1 pointer via the native clone entry point,
    /// for receivers that must outlive any guard held here.
    pub fn clone_raw(&self) -> Result<*const c_void, ObjectError> {
        let guard = self.begin_call()?;
        let cloned = native_call(|status| unsafe { (self.clone_fn)(guard.pointer(), status) });
        drop(guard);
        Ok(cloned)
    }

    /// Idempotent. Frees the native resource immediately when no call is in
    /// flight, otherwise defers the free to the last guard drop.
    pub fn destroy(&self) {
        let free_now = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.destroyed {
                return;
            }
            lifecycle.destroyed = true;
            lifecycle.in_flight == 0
        };
        if free_now {
            self.free_native();
        } else {
            debug!("destroy requested with calls in flight; deferring native free");
        }
    }

    fn release(&self) {
        let free_now = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.in_flight -= 1;
            lifecycle.destroyed && lifecycle.in_flight == 0
        };
        if free_now {
            self.free_native();
        }
    }

    // Runs outside the lifecycle lock; no native call is ever made while
    // holding it.
    fn free_native(&self) {
        native_call(|status| unsafe { (self.free_fn)(self.pointer, status) });
    }
}

/// Deterministic stand-in for a garbage-collector finalizer: the last
/// shared reference dropping requests destroy, whenever that happens to be.
impl Drop for NativeObject {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Scoped acquisition of the raw pointer for one native call.
pub struct CallGuard<'a> {
    object: &'a NativeObject,
}

impl CallGuard<'_> {
    pub fn pointer(&self) -> *const c_void {
        self.object.pointer
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.object.release();
    }
}

/// Converter for one object type, carrying its native clone/free pair.
/// Object references cross the ABI as pointers, not serialized payloads;
/// inside buffers only their 64-bit identity is written.
#[derive(Clone, Copy)]
pub struct ObjectCodec {
    clone_fn: ObjectCloneFn,
    free_fn: ObjectFreeFn,
}

impl ObjectCodec {
    pub const fn new(clone_fn: ObjectCloneFn, free_fn: ObjectFreeFn) -> Self {
        Self { clone_fn, free_fn }
    }

    /// Wraps a pointer returned by the native side, taking ownership of the
    /// reference it represents.
    pub fn lift_pointer(&self, pointer: *const c_void) -> Arc<NativeObject> {
        NativeObject::new(pointer, self.clone_fn, self.free_fn)
    }
}

impl Codec for ObjectCodec {
    type Value = Arc<NativeObject>;

    fn write(&self, writer: &mut Writer, value: &Self::Value) {
        // The reader takes ownership of an independent +1 reference, so the
        // pointer written must not depend on any guard lifetime here.
        let pointer = value
            .clone_raw()
            .unwrap_or_else(|err| panic!("cannot write object reference: {err}"));
        writer.write_u64(pointer as usize as u64);
    }

    fn read(&self, reader: &mut Reader<'_>) -> Self::Value {
        self.lift_pointer(reader.read_u64() as usize as *const c_void)
    }

    fn destroy(&self, value: Self::Value) {
        value.destroy();
    }
}

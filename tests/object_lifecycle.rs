//! Object reference lifecycle: in-flight call safety, exactly-once native
//! free, idempotent destroy, and the drop finalizer path.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use ferrogen_runtime::codec::{Reader, Writer};
use ferrogen_runtime::{Codec, NativeObject, ObjectCodec, ObjectError, RawCallStatus};
use parking_lot::Mutex;

/// Per-test native object state; the opaque pointer handed to
/// [`NativeObject`] points at one of these.
struct ObjState {
    clones: AtomicU32,
    frees: AtomicU32,
    freed_at: Mutex<Option<Instant>>,
}

impl ObjState {
    fn leak() -> &'static Self {
        Box::leak(Box::new(Self {
            clones: AtomicU32::new(0),
            frees: AtomicU32::new(0),
            freed_at: Mutex::new(None),
        }))
    }

    fn pointer(&'static self) -> *const c_void {
        std::ptr::from_ref(self).cast()
    }

    fn clones(&self) -> u32 {
        self.clones.load(Ordering::SeqCst)
    }

    fn frees(&self) -> u32 {
        self.frees.load(Ordering::SeqCst)
    }
}

extern "C" fn fake_clone(pointer: *const c_void, _status: *mut RawCallStatus) -> *const c_void {
    let state = unsafe { &*pointer.cast::<ObjState>() };
    state.clones.fetch_add(1, Ordering::SeqCst);
    pointer
}

extern "C" fn fake_free(pointer: *const c_void, _status: *mut RawCallStatus) {
    let state = unsafe { &*pointer.cast::<ObjState>() };
    state.frees.fetch_add(1, Ordering::SeqCst);
    *state.freed_at.lock() = Some(Instant::now());
}

#[test]
fn destroy_with_no_calls_in_flight_frees_immediately() {
    let state = ObjState::leak();
    let object = NativeObject::new(state.pointer(), fake_clone, fake_free);
    object.destroy();
    assert_eq!(state.frees(), 1);
}

#[test]
fn destroy_is_idempotent_and_drop_adds_no_second_free() {
    let state = ObjState::leak();
    let object = NativeObject::new(state.pointer(), fake_clone, fake_free);
    object.destroy();
    object.destroy();
    drop(object);
    assert_eq!(state.frees(), 1);
}

#[test]
fn destroy_during_call_defers_free_until_the_call_completes() {
    let state = ObjState::leak();
    let object = NativeObject::new(state.pointer(), fake_clone, fake_free);

    let guard = object.begin_call().expect("object is live");
    {
        let object = object.clone();
        thread::spawn(move || object.destroy())
            .join()
            .expect("destroy thread panicked");
    }
    assert_eq!(state.frees(), 0, "freed while a call was in flight");

    thread::sleep(Duration::from_millis(20));
    let call_done = Instant::now();
    drop(guard);

    assert_eq!(state.frees(), 1);
    let freed_at = state.freed_at.lock().expect("free was recorded");
    assert!(freed_at >= call_done, "free preceded call completion");
}

#[test]
fn begin_call_after_destroy_is_rejected() {
    let state = ObjState::leak();
    let object = NativeObject::new(state.pointer(), fake_clone, fake_free);
    object.destroy();
    assert!(matches!(
        object.begin_call().map(|_| ()),
        Err(ObjectError::UseAfterDestroy)
    ));
}

#[test]
fn last_reference_dropping_acts_as_finalizer() {
    let state = ObjState::leak();
    let object = NativeObject::new(state.pointer(), fake_clone, fake_free);
    let second = object.clone();
    drop(object);
    assert_eq!(state.frees(), 0, "freed while a reference was still held");
    drop(second);
    assert_eq!(state.frees(), 1);
}

#[test]
fn clone_raw_mints_a_native_owned_reference() {
    let state = ObjState::leak();
    let object = NativeObject::new(state.pointer(), fake_clone, fake_free);
    let pointer = object.clone_raw().expect("object is live");
    assert_eq!(pointer, state.pointer());
    assert_eq!(state.clones(), 1);

    object.destroy();
    assert!(object.clone_raw().is_err());
}

#[test]
fn codec_writes_a_cloned_pointer_and_reads_an_owning_wrapper() {
    let state = ObjState::leak();
    let codec = ObjectCodec::new(fake_clone, fake_free);
    let object = NativeObject::new(state.pointer(), fake_clone, fake_free);

    let mut writer = Writer::new();
    codec.write(&mut writer, &object);
    assert_eq!(state.clones(), 1, "write must mint an independent reference");

    let bytes = writer.into_bytes();
    let lifted = codec.read(&mut Reader::new(&bytes));
    object.destroy();
    lifted.destroy();
    assert_eq!(state.frees(), 2, "each wrapper owns one reference");
}

//! Process-wide native entry-point table and startup contract verification.
//!
//! A process may host several independent libraries; initialization is
//! guarded so a second attempt is an explicit error rather than a silent
//! re-registration with a different manifest.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::InitError;
use crate::ffi::buffer::{ForeignBytes, RawBuffer};
use crate::ffi::status::{RawCallStatus, native_call};
use crate::future;

pub type BufferFromBytesFn =
    unsafe extern "C" fn(ForeignBytes, *mut RawCallStatus) -> RawBuffer;
pub type BufferFreeFn = unsafe extern "C" fn(RawBuffer, *mut RawCallStatus);
pub type ContractVersionFn = unsafe extern "C" fn(*mut RawCallStatus) -> u32;
pub type ChecksumFn = unsafe extern "C" fn(*mut RawCallStatus) -> u16;

/// Signature of the process-wide future continuation callback the native
/// side invokes to signal a poll round.
pub type FutureContinuationFn = unsafe extern "C" fn(handle: u64, poll_result: i8);

pub type SetFutureContinuationFn =
    unsafe extern "C" fn(FutureContinuationFn, *mut RawCallStatus);

/// The always-present native entry points every generated binding relies on.
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub buffer_from_bytes: BufferFromBytesFn,
    pub buffer_free: BufferFreeFn,
    pub contract_version: ContractVersionFn,
    pub set_future_continuation: SetFutureContinuationFn,
}

/// Expected checksum for one generated function, paired with the native
/// entry point that reports the live value.
pub struct FunctionChecksum {
    pub name: &'static str,
    pub expected: u16,
    pub reported: ChecksumFn,
}

/// Contract the generated bindings were built against. Checksums are stable
/// within one build of the definitions, not across builds.
pub struct ContractManifest {
    pub contract_version: u32,
    pub checksums: Vec<FunctionChecksum>,
}

static NATIVE_API: OnceCell<NativeApi> = OnceCell::new();
static INIT_GUARD: Mutex<()> = Mutex::new(());

/// Verifies the contract version and every per-function checksum against
/// the live native library, registers the future continuation callback, and
/// publishes the entry-point table. Any mismatch is fatal at startup: it
/// means the bindings and the native library come from different builds of
/// the same definitions.
pub fn initialize(api: NativeApi, manifest: &ContractManifest) -> Result<(), InitError> {
    let _guard = INIT_GUARD.lock();
    if NATIVE_API.get().is_some() {
        return Err(InitError::AlreadyInitialized);
    }

    let found = native_call(|status| unsafe { (api.contract_version)(status) });
    if found != manifest.contract_version {
        return Err(InitError::ContractVersionMismatch {
            expected: manifest.contract_version,
            found,
        });
    }
    debug!(version = found, "native contract version verified");

    for checksum in &manifest.checksums {
        let found = native_call(|status| unsafe { (checksum.reported)(status) });
        if found != checksum.expected {
            return Err(InitError::ChecksumMismatch {
                function: checksum.name,
                expected: checksum.expected,
                found,
            });
        }
    }
    debug!(
        functions = manifest.checksums.len(),
        "per-function checksums verified"
    );

    native_call(|status| unsafe {
        (api.set_future_continuation)(future::future_continuation, status);
    });

    NATIVE_API
        .set(api)
        .map_err(|_| InitError::AlreadyInitialized)?;
    info!("ferrogen runtime initialized");
    Ok(())
}

pub fn is_initialized() -> bool {
    NATIVE_API.get().is_some()
}

/// The published entry-point table. Calling this before a successful
/// [`initialize`] is a programming error in the generated glue.
pub fn native_api() -> &'static NativeApi {
    NATIVE_API
        .get()
        .expect("ferrogen runtime used before initialize()")
}

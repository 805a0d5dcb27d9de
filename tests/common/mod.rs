//! Fake native side shared by the integration tests: a heap-backed buffer
//! allocator with a live-buffer balance, a contract reporting fixed
//! version/checksum values, and storage for the registered future
//! continuation so tests can drive poll rounds by hand.
#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Once, OnceLock};

use ferrogen_runtime::ffi::api::FutureContinuationFn;
use ferrogen_runtime::{
    ContractManifest, ForeignBytes, FunctionChecksum, NativeApi, RawBuffer, RawCallStatus,
    initialize,
};

pub const CONTRACT_VERSION: u32 = 29;
pub const PING_CHECKSUM: u16 = 4242;
pub const PULSE_CHECKSUM: u16 = 777;

static LIVE_BUFFERS: AtomicI64 = AtomicI64::new(0);
static CONTINUATION: OnceLock<FutureContinuationFn> = OnceLock::new();
static SETUP: Once = Once::new();

/// Copies `data` into a heap allocation the fake native side owns.
pub fn alloc_buffer(data: &[u8]) -> RawBuffer {
    let mut copy = data.to_vec();
    let raw = RawBuffer {
        capacity: copy.capacity() as u64,
        len: copy.len() as u64,
        data: copy.as_mut_ptr(),
    };
    std::mem::forget(copy);
    LIVE_BUFFERS.fetch_add(1, Ordering::SeqCst);
    raw
}

pub extern "C" fn fake_buffer_from_bytes(
    bytes: ForeignBytes,
    _status: *mut RawCallStatus,
) -> RawBuffer {
    let data = unsafe { std::slice::from_raw_parts(bytes.data, bytes.len as usize) };
    alloc_buffer(data)
}

pub extern "C" fn fake_buffer_free(buffer: RawBuffer, _status: *mut RawCallStatus) {
    if buffer.data.is_null() {
        return;
    }
    unsafe {
        drop(Vec::from_raw_parts(
            buffer.data,
            buffer.len as usize,
            buffer.capacity as usize,
        ));
    }
    LIVE_BUFFERS.fetch_sub(1, Ordering::SeqCst);
}

pub extern "C" fn fake_contract_version(_status: *mut RawCallStatus) -> u32 {
    CONTRACT_VERSION
}

pub extern "C" fn fake_checksum_ping(_status: *mut RawCallStatus) -> u16 {
    PING_CHECKSUM
}

pub extern "C" fn fake_checksum_pulse(_status: *mut RawCallStatus) -> u16 {
    PULSE_CHECKSUM
}

pub extern "C" fn fake_set_continuation(
    continuation: FutureContinuationFn,
    _status: *mut RawCallStatus,
) {
    let _ = CONTINUATION.set(continuation);
}

/// Number of native-owned buffers currently allocated by the fake side.
pub fn live_buffers() -> i64 {
    LIVE_BUFFERS.load(Ordering::SeqCst)
}

/// The continuation callback the runtime registered during initialization.
pub fn continuation() -> FutureContinuationFn {
    *CONTINUATION
        .get()
        .expect("runtime has not registered a future continuation")
}

pub fn api() -> NativeApi {
    NativeApi {
        buffer_from_bytes: fake_buffer_from_bytes,
        buffer_free: fake_buffer_free,
        contract_version: fake_contract_version,
        set_future_continuation: fake_set_continuation,
    }
}

pub fn manifest() -> ContractManifest {
    ContractManifest {
        contract_version: CONTRACT_VERSION,
        checksums: vec![
            FunctionChecksum {
                name: "ping",
                expected: PING_CHECKSUM,
                reported: fake_checksum_ping,
            },
            FunctionChecksum {
                name: "pulse",
                expected: PULSE_CHECKSUM,
                reported: fake_checksum_pulse,
            },
        ],
    }
}

/// Initializes tracing and the runtime against the fake native side, once
/// per test binary.
pub fn setup() {
    SETUP.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
        initialize(api(), &manifest()).expect("runtime initialization against fake native side");
    });
}

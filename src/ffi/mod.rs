//! The raw boundary with the native library: ABI structs, the call status
//! convention, and the process-wide entry-point table.

pub mod api;
pub mod buffer;
pub mod status;

pub use api::{ContractManifest, FunctionChecksum, NativeApi};
pub use buffer::{ForeignBytes, NativeBuffer, RawBuffer};
pub use status::{CALL_ERROR, CALL_PANIC, CALL_SUCCESS, RawCallStatus};

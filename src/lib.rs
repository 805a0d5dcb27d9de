//! Runtime support layer for ferrogen-generated foreign bindings.
//!
//! Generated glue code stays thin; everything it needs at execution time
//! lives here: the byte codec and lift/lower framework, the concurrent
//! handle tables, the object reference lifecycle, the async call bridge,
//! and the callback dispatch runtime. The native library is an opaque C
//! ABI surface reached through the entry-point table registered with
//! [`initialize`].

pub mod callback;
pub mod codec;
pub mod error;
pub mod ffi;
pub mod future;
pub mod handles;
pub mod object;

pub use callback::{CallbackRegistry, DispatchOutcome, ForeignFuture};
pub use codec::Codec;
pub use error::{InitError, ObjectError};
pub use future::{call_async, call_async_with_error};
pub use handles::HandleMap;
pub use object::{CallGuard, NativeObject, ObjectCodec};
pub use ffi::api::{ContractManifest, FunctionChecksum, NativeApi, initialize, native_api};
pub use ffi::buffer::{ForeignBytes, NativeBuffer, RawBuffer};
pub use ffi::status::{RawCallStatus, native_call, native_call_with_error};

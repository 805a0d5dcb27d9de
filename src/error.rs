use thiserror::Error;

/// Startup failures reported by [`crate::initialize`]. All of them are
/// fatal: a mismatch means the generated bindings and the native library
/// were built from different definitions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("ferrogen runtime is already initialized")]
    AlreadyInitialized,
    #[error("contract version mismatch: bindings expect {expected}, native library reports {found}")]
    ContractVersionMismatch { expected: u32, found: u32 },
    #[error(
        "checksum mismatch for `{function}`: bindings expect {expected}, native library reports {found}"
    )]
    ChecksumMismatch {
        function: &'static str,
        expected: u16,
        found: u16,
    },
}

/// Lifecycle errors for native object references.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ObjectError {
    #[error("object used after destroy")]
    UseAfterDestroy,
}

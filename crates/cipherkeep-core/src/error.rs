//! Cryptographic error types for `cipherkeep-core`.

use thiserror::Error;

/// Errors produced by the secure allocator, secret buffers, primitives,
/// and cipher state machine.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum CoreError {
    /// The allocator's backing region has no block large enough to satisfy
    /// the request.
    #[error("no available heap memory")]
    NoAvailableHeapMemory,

    /// A pointer/offset passed to a `SecretBytes` operation did not come
    /// from this allocator, or is out of range.
    #[error("bad pointer")]
    BadPointer,

    /// `realloc` was called on a fixed (caller-owned) view.
    #[error("memory is fixed")]
    MemoryIsFixed,

    /// An owning `SecretBytes` was released while still exposed to a
    /// caller without being moved first.
    #[error("data still exposed")]
    DataStillExposed,

    /// A zero-length allocation or operation was requested where a
    /// positive length is required.
    #[error("size is 0")]
    SizeIsZero,

    /// The platform RNG failed to fill a buffer.
    #[error("secure memory error: {0}")]
    SecureMemory(&'static str),

    /// A cipher operation was attempted from a state that does not permit
    /// it (see the {Zeroed, Prepared, Ready, Completed} lifecycle).
    #[error("cipher not in the right state")]
    CipherNotInRightState,

    /// An encrypt/decrypt buffer was smaller than required.
    #[error("buffer too small")]
    BufferTooSmall,

    /// The underlying block-cipher or hash primitive rejected its input
    /// (e.g. a plaintext length that is not a block multiple).
    #[error("primitive error: {0}")]
    Primitive(&'static str),
}

//! Error types for voxmem.

use crate::alloc::PolicyKind;
use crate::stream::StorageKey;
use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by the buffer memory manager.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying allocation call could not obtain memory.
    #[error("out of memory: failed to obtain {requested} bytes")]
    OutOfMemory {
        /// Number of bytes that were requested.
        requested: u64,
    },

    /// The operation is outside the capability contract of the handle's
    /// allocation policy (e.g. reallocating a heap-fixed buffer).
    #[error("`{operation}` is not supported by the {policy} allocation policy")]
    UnsupportedOperation {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Allocation policy that rejected it.
        policy: PolicyKind,
    },

    /// A lock was requested on a buffer that has never been allocated.
    #[error("buffer is not allocated")]
    NotAllocated,

    /// A dumped buffer could not be read back from its stream backing.
    /// The buffer stays dumped and no lock is granted.
    #[error("failed to restore buffer from backing `{key}`")]
    RestoreFailed {
        /// Storage key of the backing that failed.
        key: StorageKey,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A dumped buffer has no stream backing to restore from.
    #[error("buffer has no stream factory attached")]
    NoStreamFactory,

    /// The operation requires the buffer to be unlocked, but at least one
    /// lock is outstanding.
    #[error("buffer is locked")]
    BufferLocked,

    /// The buffer is not registered with this manager.
    #[error("buffer is not registered with this manager")]
    NotRegistered,

    /// No dump policy is registered under the given name.
    #[error("unknown dump policy `{0}`")]
    UnknownPolicy(String),

    /// A dump policy parameter name or value was rejected.
    #[error("invalid value `{value}` for dump policy parameter `{name}`")]
    InvalidParameter {
        /// Parameter name as supplied by the configuration.
        name: String,
        /// Offending value.
        value: String,
    },

    /// Ambient I/O failure (dump write, backing store access).
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

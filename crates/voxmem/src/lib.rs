//! Managed buffers with pluggable allocation policies and
//! dump-to-stream eviction.
//!
//! `voxmem` keeps large byte buffers behind handles instead of raw
//! pointers. A process-wide [`BufferManager`] tracks every buffer's size,
//! residency and pin count, and when memory runs short it can *dump*
//! unpinned buffers to a stream backing and transparently *restore* them
//! on the next access.
//!
//! # Core pieces
//!
//! - [`BufferObject`]: handle owning one managed region. Its bytes are
//!   only reachable through a [`BufferLock`], which pins the buffer
//!   resident while the guard lives.
//! - [`alloc::AllocationPolicy`]: how the region's memory is obtained
//!   (growable heap, fixed heap, or externally owned).
//! - [`policy::DumpPolicy`]: when the manager should evict, expressed as
//!   a byte reclaim target over current [`policy::MemoryUsage`].
//! - [`stream::StreamFactory`]: where dumped bytes go (files, in-memory
//!   slots, or anything implementing the trait).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use voxmem::{BufferManager, BufferObject, MemoryStreamFactory, StorageKey};
//!
//! # fn main() -> voxmem::Result<()> {
//! let manager = BufferManager::with_defaults();
//! let buffer = BufferObject::new(&manager);
//! buffer.allocate(1024)?;
//!
//! {
//!     let lock = buffer.lock()?;
//!     lock.bytes_mut()[0] = 42;
//! }
//!
//! // Attach a backing so the buffer can be dumped and restored.
//! let factory = Arc::new(MemoryStreamFactory::new());
//! buffer.set_stream_factory(factory, StorageKey::from("scratch"), 0)?;
//! assert!(manager.dump(buffer.id())?);
//!
//! let lock = buffer.lock()?; // restores transparently
//! assert_eq!(lock.bytes()[0], 42);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod alloc;
pub mod bytesize;
pub mod error;
pub mod handle;
pub mod manager;
pub mod policy;
pub mod probe;
pub mod stream;

pub use alloc::{AllocationPolicy, ForeignRegion, Memory, PolicyKind};
pub use error::{Error, Result};
pub use handle::{BufferLock, BufferObject, Residency};
pub use manager::{
    BufferId, BufferManager, BufferManagerConfig, BufferStats, LoadingMode,
};
pub use policy::{DumpPolicy, DumpPolicyConfig, MemoryUsage};
pub use probe::{FixedProbe, MemoryProbe, SystemProbe};
pub use stream::{FileStreamFactory, MemoryStreamFactory, StorageKey, StreamFactory};

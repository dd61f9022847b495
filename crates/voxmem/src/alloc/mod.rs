//! Allocation strategies for managed buffers.
//!
//! Every [`crate::handle::BufferObject`] is bound at creation to one
//! [`AllocationPolicy`] that performs the raw allocate / reallocate /
//! destroy work for its memory region. Policies expose a capability
//! contract: heap-reallocating buffers can be resized in place,
//! heap-fixed buffers must be destroyed and reallocated, and no-alloc
//! buffers wrap foreign memory the manager must never free.

mod memory;
mod policies;

pub use memory::{ForeignRegion, Memory};
pub use policies::{HeapFixedPolicy, HeapReallocPolicy, NoAllocPolicy};

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Identifies which concrete allocation strategy a handle uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Heap memory that supports in-place resizing.
    HeapRealloc,
    /// Heap memory with a fixed size; resizing requires destroy + allocate.
    HeapFixed,
    /// Foreign memory owned outside the manager; no mutating operation is
    /// supported.
    NoAlloc,
}

impl PolicyKind {
    /// Returns a shareable policy instance for this kind.
    ///
    /// Policy objects are stateless, so a fresh instance is equivalent to
    /// a shared one.
    #[must_use]
    pub fn policy(self) -> Arc<dyn AllocationPolicy> {
        match self {
            Self::HeapRealloc => Arc::new(HeapReallocPolicy),
            Self::HeapFixed => Arc::new(HeapFixedPolicy),
            Self::NoAlloc => Arc::new(NoAllocPolicy),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HeapRealloc => "heap-realloc",
            Self::HeapFixed => "heap-fixed",
            Self::NoAlloc => "no-alloc",
        };
        f.write_str(name)
    }
}

/// Raw allocation strategy for a single buffer.
///
/// Implementations are stateless and may be shared across any number of
/// handles. They only transform the memory region they are given; all
/// bookkeeping (sizes, residency, counters) lives in the manager.
pub trait AllocationPolicy: Send + Sync {
    /// The capability class of this policy.
    fn kind(&self) -> PolicyKind;

    /// Whether [`AllocationPolicy::reallocate`] is part of this policy's
    /// capability contract.
    fn can_reallocate(&self) -> bool {
        false
    }

    /// Allocates a zero-filled region of `size` bytes.
    ///
    /// A `size` of zero is a no-op yielding no region.
    fn allocate(&self, size: u64) -> Result<Option<Memory>>;

    /// Resizes the region in `slot` to `new_size` bytes, preserving the
    /// leading `min(old, new)` bytes. Resizing to zero releases the region.
    ///
    /// On error `slot` is left untouched.
    fn reallocate(&self, slot: &mut Option<Memory>, new_size: u64) -> Result<()>;

    /// Releases a region previously produced by this policy.
    fn destroy(&self, region: Memory) -> Result<()>;
}

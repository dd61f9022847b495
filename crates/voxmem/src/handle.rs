//! Buffer handles and scoped locks.
//!
//! A [`BufferObject`] is the logical owner of one managed memory region.
//! Its bytes are only reachable through a [`BufferLock`], which pins the
//! buffer resident for as long as the guard lives: the eviction machinery
//! never selects a locked buffer, and locking a dumped buffer first
//! restores its content from the stream backing.

use crate::alloc::{AllocationPolicy, ForeignRegion, Memory, PolicyKind};
use crate::error::Result;
use crate::manager::{BufferId, BufferManager};
use crate::stream::{StorageKey, StreamFactory};
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::fmt;
use std::sync::Arc;

/// Residency state of a buffer's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// Never allocated, or explicitly freed.
    Empty,
    /// Bytes are in addressable memory.
    Resident,
    /// Bytes exist only in the stream backing.
    Dumped,
}

/// The part of a buffer shared between its handle, its locks, and the
/// manager's registry entry. The registry holds it weakly: handle and
/// outstanding locks own the memory.
pub(crate) struct BufferCell {
    pub(crate) id: BufferId,
    pub(crate) state: RwLock<CellState>,
}

pub(crate) struct CellState {
    pub(crate) memory: Option<Memory>,
    pub(crate) policy: Arc<dyn AllocationPolicy>,
}

/// Logical buffer managed by a [`BufferManager`].
///
/// The handle owns the memory region; the allocation policy chosen at
/// creation is fixed for its whole lifetime. Dropping the handle
/// unregisters it and releases any resident memory.
pub struct BufferObject {
    cell: Arc<BufferCell>,
    manager: Arc<BufferManager>,
}

impl BufferObject {
    /// Creates an empty handle using the heap-reallocating policy.
    #[must_use]
    pub fn new(manager: &Arc<BufferManager>) -> Self {
        Self::with_policy_kind(manager, PolicyKind::HeapRealloc)
    }

    /// Creates an empty handle using one of the built-in policies.
    #[must_use]
    pub fn with_policy_kind(manager: &Arc<BufferManager>, kind: PolicyKind) -> Self {
        Self::with_policy(manager, kind.policy())
    }

    /// Creates an empty handle using a caller-supplied allocation policy.
    #[must_use]
    pub fn with_policy(manager: &Arc<BufferManager>, policy: Arc<dyn AllocationPolicy>) -> Self {
        let cell = manager.register(policy);
        Self {
            cell,
            manager: Arc::clone(manager),
        }
    }

    /// The manager-assigned identity of this buffer.
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.cell.id
    }

    /// Allocates `size` zero-filled bytes, replacing any previous content.
    ///
    /// `allocate(0)` leaves the handle empty. Fails with
    /// [`crate::Error::BufferLocked`] while a lock is outstanding.
    pub fn allocate(&self, size: u64) -> Result<()> {
        self.manager.allocate(&self.cell, size)
    }

    /// Resizes the buffer to `new_size` bytes, preserving the leading
    /// `min(old, new)` bytes. A dumped buffer is restored at the new size.
    ///
    /// Only available under the heap-reallocating policy.
    pub fn reallocate(&self, new_size: u64) -> Result<()> {
        self.manager.reallocate(&self.cell, new_size)
    }

    /// Frees the buffer's content and detaches its stream backing.
    pub fn destroy(&self) -> Result<()> {
        self.manager.destroy(&self.cell)
    }

    /// Adopts caller-provided bytes as the buffer's content.
    pub fn set_bytes(&self, bytes: Vec<u8>) -> Result<()> {
        self.manager.set_bytes(&self.cell, bytes)
    }

    /// Wraps externally owned memory. Requires the no-alloc policy.
    pub fn set_foreign(&self, region: Box<dyn ForeignRegion>) -> Result<()> {
        self.manager.set_foreign(&self.cell, region)
    }

    /// Attaches a stream backing for dump and restore.
    ///
    /// On an empty handle with `size > 0` this declares lazily loadable
    /// content: the handle becomes dumped and the first lock materializes
    /// the bytes (immediately, under the `Direct` loading mode).
    pub fn set_stream_factory(
        &self,
        factory: Arc<dyn StreamFactory>,
        key: StorageKey,
        size: u64,
    ) -> Result<()> {
        self.manager
            .set_stream_factory(&self.cell, factory, key, size)
    }

    /// Exchanges content, size, residency, stream backing and allocation
    /// policy with `other`. Both handles must belong to the same manager
    /// and be unlocked.
    pub fn swap(&self, other: &BufferObject) -> Result<()> {
        self.manager.swap(&self.cell, &other.cell, &other.manager)
    }

    /// Pins the buffer resident and returns the access guard.
    ///
    /// A dumped buffer is restored first; an empty buffer fails with
    /// [`crate::Error::NotAllocated`].
    pub fn lock(&self) -> Result<BufferLock> {
        self.manager.lock(&self.cell)?;
        Ok(BufferLock {
            cell: Arc::clone(&self.cell),
            manager: Arc::clone(&self.manager),
        })
    }

    /// Current logical size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.manager.size_of(self.cell.id)
    }

    /// Whether the buffer holds no content (`size() == 0`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Current residency state.
    #[must_use]
    pub fn residency(&self) -> Residency {
        self.manager.residency_of(self.cell.id)
    }

    /// Number of outstanding locks.
    #[must_use]
    pub fn lock_count(&self) -> u64 {
        self.manager.lock_count_of(self.cell.id)
    }
}

impl Drop for BufferObject {
    fn drop(&mut self) {
        self.manager.unregister(&self.cell);
    }
}

impl fmt::Debug for BufferObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferObject")
            .field("id", &self.cell.id)
            .field("size", &self.size())
            .field("residency", &self.residency())
            .field("lock_count", &self.lock_count())
            .finish()
    }
}

/// Scoped pin on a buffer.
///
/// While the guard lives the buffer stays resident and its bytes stay in
/// place. The pin is released exactly once, on drop, on every exit path.
/// Multiple guards may exist for the same buffer; coordinating concurrent
/// writes to the content is up to the callers.
pub struct BufferLock {
    cell: Arc<BufferCell>,
    manager: Arc<BufferManager>,
}

impl BufferLock {
    /// The identity of the pinned buffer.
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.cell.id
    }

    /// Read access to the buffer's bytes.
    #[must_use]
    pub fn bytes(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.cell.state.read(), |state| {
            state.memory.as_ref().map_or(&[][..], Memory::as_slice)
        })
    }

    /// Write access to the buffer's bytes.
    #[must_use]
    pub fn bytes_mut(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.cell.state.write(), |state| match state.memory.as_mut() {
            Some(memory) => memory.as_mut_slice(),
            None => &mut [],
        })
    }

    /// Releases the pin explicitly. Equivalent to dropping the guard.
    pub fn unlock(self) {
        drop(self);
    }
}

impl Drop for BufferLock {
    fn drop(&mut self) {
        self.manager.release_lock(&self.cell);
    }
}

impl fmt::Debug for BufferLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferLock").field("id", &self.cell.id).finish()
    }
}

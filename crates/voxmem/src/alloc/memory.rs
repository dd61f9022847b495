//! In-memory representation of a managed buffer's bytes.

use std::fmt;

/// Mutable byte region whose storage is owned outside the manager.
///
/// Typical implementors are memory maps or slices of caller-managed
/// arenas. Dropping the wrapper must not invalidate other owners of the
/// underlying storage; the manager never attempts to free foreign memory
/// through its allocation policies.
pub trait ForeignRegion: Send + Sync {
    /// Length of the region in bytes.
    fn len(&self) -> usize;

    /// Whether the region is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the region.
    fn as_slice(&self) -> &[u8];

    /// Write access to the region.
    fn as_mut_slice(&mut self) -> &mut [u8];
}

impl ForeignRegion for memmap2::MmapMut {
    fn len(&self) -> usize {
        self[..].len()
    }

    fn as_slice(&self) -> &[u8] {
        &self[..]
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self[..]
    }
}

/// The resident bytes of a managed buffer.
pub enum Memory {
    /// Heap storage owned by the buffer.
    Owned(Box<[u8]>),
    /// Foreign storage wrapped under the no-alloc policy.
    Foreign(Box<dyn ForeignRegion>),
}

impl Memory {
    /// Length of the region in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Owned(bytes) => bytes.len(),
            Self::Foreign(region) => region.len(),
        }
    }

    /// Whether the region is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the region.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Foreign(region) => region.as_slice(),
        }
    }

    /// Write access to the region.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Foreign(region) => region.as_mut_slice(),
        }
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned(bytes) => f.debug_tuple("Owned").field(&bytes.len()).finish(),
            Self::Foreign(region) => f.debug_tuple("Foreign").field(&region.len()).finish(),
        }
    }
}

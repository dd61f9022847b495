//! The three concrete allocation policies.

use super::{AllocationPolicy, Memory, PolicyKind};
use crate::error::{Error, Result};

fn checked_len(size: u64) -> Result<usize> {
    usize::try_from(size).map_err(|_| Error::OutOfMemory { requested: size })
}

fn alloc_zeroed(size: u64) -> Result<Option<Memory>> {
    if size == 0 {
        return Ok(None);
    }

    let len = checked_len(size)?;
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { requested: size })?;
    bytes.resize(len, 0);
    Ok(Some(Memory::Owned(bytes.into_boxed_slice())))
}

/// Heap allocation with in-place resizing.
///
/// The reference policy for buffers whose size changes over time.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapReallocPolicy;

impl AllocationPolicy for HeapReallocPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::HeapRealloc
    }

    fn can_reallocate(&self) -> bool {
        true
    }

    fn allocate(&self, size: u64) -> Result<Option<Memory>> {
        alloc_zeroed(size)
    }

    fn reallocate(&self, slot: &mut Option<Memory>, new_size: u64) -> Result<()> {
        if new_size == 0 {
            *slot = None;
            return Ok(());
        }

        match slot.take() {
            None => {
                *slot = alloc_zeroed(new_size)?;
                Ok(())
            }
            Some(Memory::Owned(old)) => {
                let len = match checked_len(new_size) {
                    Ok(len) => len,
                    Err(e) => {
                        *slot = Some(Memory::Owned(old));
                        return Err(e);
                    }
                };

                let mut bytes = old.into_vec();
                if len > bytes.len() {
                    if bytes.try_reserve_exact(len - bytes.len()).is_err() {
                        *slot = Some(Memory::Owned(bytes.into_boxed_slice()));
                        return Err(Error::OutOfMemory {
                            requested: new_size,
                        });
                    }
                    bytes.resize(len, 0);
                } else {
                    bytes.truncate(len);
                }

                *slot = Some(Memory::Owned(bytes.into_boxed_slice()));
                Ok(())
            }
            Some(foreign @ Memory::Foreign(_)) => {
                *slot = Some(foreign);
                Err(Error::UnsupportedOperation {
                    operation: "reallocate foreign memory",
                    policy: self.kind(),
                })
            }
        }
    }

    fn destroy(&self, region: Memory) -> Result<()> {
        drop(region);
        Ok(())
    }
}

/// Heap allocation without resizing.
///
/// Callers that need a different size must destroy and allocate again.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapFixedPolicy;

impl AllocationPolicy for HeapFixedPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::HeapFixed
    }

    fn allocate(&self, size: u64) -> Result<Option<Memory>> {
        alloc_zeroed(size)
    }

    fn reallocate(&self, _slot: &mut Option<Memory>, _new_size: u64) -> Result<()> {
        Err(Error::UnsupportedOperation {
            operation: "reallocate",
            policy: self.kind(),
        })
    }

    fn destroy(&self, region: Memory) -> Result<()> {
        drop(region);
        Ok(())
    }
}

/// Policy for buffers that wrap foreign memory.
///
/// Exists so a handle can expose externally owned storage (memory maps,
/// caller-managed arenas) under the same interface without the manager
/// ever allocating or freeing it. Every mutating operation is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAllocPolicy;

impl AllocationPolicy for NoAllocPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::NoAlloc
    }

    fn allocate(&self, _size: u64) -> Result<Option<Memory>> {
        Err(Error::UnsupportedOperation {
            operation: "allocate",
            policy: self.kind(),
        })
    }

    fn reallocate(&self, _slot: &mut Option<Memory>, _new_size: u64) -> Result<()> {
        Err(Error::UnsupportedOperation {
            operation: "reallocate",
            policy: self.kind(),
        })
    }

    fn destroy(&self, region: Memory) -> Result<()> {
        // Only the wrapper is dropped; the foreign storage stays with its
        // real owner.
        drop(region);
        Err(Error::UnsupportedOperation {
            operation: "destroy",
            policy: self.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_allocate_zero_is_noop() {
        let policy = HeapReallocPolicy;
        assert!(policy.allocate(0).unwrap().is_none());

        let policy = HeapFixedPolicy;
        assert!(policy.allocate(0).unwrap().is_none());
    }

    #[test]
    fn test_allocate_is_zero_filled() {
        let policy = HeapReallocPolicy;
        let memory = policy.allocate(64).unwrap().unwrap();
        assert_eq!(memory.len(), 64);
        assert!(memory.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reallocate_preserves_prefix() {
        let policy = HeapReallocPolicy;
        let mut slot = policy.allocate(4).unwrap();
        slot.as_mut()
            .unwrap()
            .as_mut_slice()
            .copy_from_slice(&[1, 2, 3, 4]);

        policy.reallocate(&mut slot, 8).unwrap();
        assert_eq!(&slot.as_ref().unwrap().as_slice()[..4], &[1, 2, 3, 4]);
        assert_eq!(&slot.as_ref().unwrap().as_slice()[4..], &[0, 0, 0, 0]);

        policy.reallocate(&mut slot, 2).unwrap();
        assert_eq!(slot.as_ref().unwrap().as_slice(), &[1, 2]);
    }

    #[test]
    fn test_reallocate_to_zero_releases() {
        let policy = HeapReallocPolicy;
        let mut slot = policy.allocate(16).unwrap();
        policy.reallocate(&mut slot, 0).unwrap();
        assert!(slot.is_none());
    }

    #[test]
    fn test_heap_fixed_rejects_reallocate() {
        let policy = HeapFixedPolicy;
        let mut slot = policy.allocate(16).unwrap();
        let err = policy.reallocate(&mut slot, 32).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedOperation {
                operation: "reallocate",
                policy: PolicyKind::HeapFixed,
            }
        ));
        // The region is untouched by the failed call.
        assert_eq!(slot.unwrap().len(), 16);
    }

    #[test]
    fn test_no_alloc_rejects_everything() {
        let policy = NoAllocPolicy;
        assert!(matches!(
            policy.allocate(1),
            Err(Error::UnsupportedOperation { .. })
        ));
        let mut slot = None;
        assert!(matches!(
            policy.reallocate(&mut slot, 1),
            Err(Error::UnsupportedOperation { .. })
        ));
    }
}

//! The evict-everything dump policy.

use super::{DumpPolicy, MemoryUsage};

/// Policy that dumps every evictable buffer at every consultation.
///
/// Buffers are restored on lock and dumped again as soon as the lock is
/// released. Mostly useful for testing restore paths and for extremely
/// memory-constrained deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysDump;

impl DumpPolicy for AlwaysDump {
    fn name(&self) -> &'static str {
        "always"
    }

    fn reclaim_target(&self, usage: &MemoryUsage) -> u64 {
        usage.total_resident
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reclaims_everything_resident() {
        let policy = AlwaysDump;
        let usage = MemoryUsage {
            total_resident: 4096,
            total_dumped: 123,
            free_system: u64::MAX,
        };
        assert_eq!(policy.reclaim_target(&usage), 4096);
    }
}

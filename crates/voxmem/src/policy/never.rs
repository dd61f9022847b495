//! The do-nothing dump policy.

use super::{DumpPolicy, MemoryUsage};

/// Policy that never evicts anything.
///
/// Useful as the explicit "eviction disabled" configuration; already
/// dumped buffers are still restored normally on lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverDump;

impl DumpPolicy for NeverDump {
    fn name(&self) -> &'static str {
        "never"
    }

    fn reclaim_target(&self, _usage: &MemoryUsage) -> u64 {
        0
    }
}

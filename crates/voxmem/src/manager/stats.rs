//! Aggregate statistics over all managed buffers.

use crate::bytesize;
use std::fmt;

/// Snapshot of the manager's registry, taken under the read lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Sum of the logical sizes of all managed buffers.
    pub total_managed: u64,
    /// Sum of the sizes of buffers whose bytes live only in their backing.
    pub total_dumped: u64,
    /// Number of resident buffers.
    pub resident_count: usize,
    /// Number of dumped buffers.
    pub dumped_count: usize,
}

impl BufferStats {
    /// Sum of the sizes of resident buffers.
    #[must_use]
    pub fn total_resident(&self) -> u64 {
        self.total_managed - self.total_dumped
    }
}

impl fmt::Display for BufferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resident ({}), {} dumped ({}), {} managed",
            self.resident_count,
            bytesize::format(self.total_resident()),
            self.dumped_count,
            bytesize::format(self.total_dumped),
            bytesize::format(self.total_managed),
        )
    }
}

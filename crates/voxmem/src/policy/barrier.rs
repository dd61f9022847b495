//! The barrier dump policy.

use super::{DumpPolicy, MemoryUsage};
use crate::bytesize;
use crate::error::{Error, Result};

const DEFAULT_BARRIER: u64 = 1024 * 1024 * 1024; // 1 GiB

/// Policy that keeps the total resident size under a fixed barrier.
///
/// Whenever the sum of resident buffer sizes exceeds the barrier, the
/// excess is reclaimed from the least recently touched candidates.
#[derive(Debug, Clone, Copy)]
pub struct BarrierDump {
    barrier: u64,
}

impl BarrierDump {
    /// Creates a policy with the given barrier, in bytes.
    #[must_use]
    pub fn new(barrier: u64) -> Self {
        Self { barrier }
    }

    /// The configured barrier, in bytes.
    #[must_use]
    pub fn barrier(&self) -> u64 {
        self.barrier
    }
}

impl Default for BarrierDump {
    fn default() -> Self {
        Self::new(DEFAULT_BARRIER)
    }
}

impl DumpPolicy for BarrierDump {
    fn name(&self) -> &'static str {
        "barrier"
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["barrier"]
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = || Error::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        };
        if name != "barrier" {
            return Err(invalid());
        }
        self.barrier = bytesize::parse(value).ok_or_else(invalid)?;
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        (name == "barrier").then(|| bytesize::format(self.barrier))
    }

    fn reclaim_target(&self, usage: &MemoryUsage) -> u64 {
        usage.total_resident.saturating_sub(self.barrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(total_resident: u64) -> MemoryUsage {
        MemoryUsage {
            total_resident,
            total_dumped: 0,
            free_system: u64::MAX,
        }
    }

    #[test]
    fn test_under_barrier_reclaims_nothing() {
        let policy = BarrierDump::new(100);
        assert_eq!(policy.reclaim_target(&usage(100)), 0);
        assert_eq!(policy.reclaim_target(&usage(0)), 0);
    }

    #[test]
    fn test_over_barrier_reclaims_excess() {
        let policy = BarrierDump::new(100);
        assert_eq!(policy.reclaim_target(&usage(150)), 50);
    }

    #[test]
    fn test_parameters() {
        let mut policy = BarrierDump::default();
        assert_eq!(policy.parameter_names(), ["barrier"]);
        assert!(policy.set_parameter("banner", "1B").is_err());
        assert!(policy.set_parameter("barrier", "-1B").is_err());
        policy.set_parameter("barrier", "1B").unwrap();
        assert_eq!(policy.barrier(), 1);
        assert_eq!(policy.parameter("barrier").unwrap(), "1 B");
    }
}

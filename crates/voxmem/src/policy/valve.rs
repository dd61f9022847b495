//! The valve dump policy.

use super::{DumpPolicy, MemoryUsage};
use crate::bytesize;
use crate::error::{Error, Result};

const DEFAULT_MIN_FREE: u64 = 512 * 1024 * 1024; // 512 MiB
const DEFAULT_HYSTERESIS: u64 = 0;

/// Low-water-mark policy on free system memory, with hysteresis.
///
/// When free system memory drops below `min_free_mem`, enough buffers
/// are evicted to bring it back to `min_free_mem + hysteresis_offset`.
/// The extra margin avoids thrashing right at the mark. If eviction
/// candidates run out before the target is met, the shortfall is simply
/// left to the operation that triggered the check.
#[derive(Debug, Clone, Copy)]
pub struct ValveDump {
    min_free: u64,
    hysteresis: u64,
}

impl ValveDump {
    /// Creates a policy with the given low-water mark and hysteresis
    /// margin, both in bytes.
    #[must_use]
    pub fn new(min_free: u64, hysteresis: u64) -> Self {
        Self {
            min_free,
            hysteresis,
        }
    }

    /// The low-water mark on free system memory, in bytes.
    #[must_use]
    pub fn min_free(&self) -> u64 {
        self.min_free
    }

    /// The hysteresis margin, in bytes.
    #[must_use]
    pub fn hysteresis(&self) -> u64 {
        self.hysteresis
    }
}

impl Default for ValveDump {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FREE, DEFAULT_HYSTERESIS)
    }
}

impl DumpPolicy for ValveDump {
    fn name(&self) -> &'static str {
        "valve"
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["min_free_mem", "hysteresis_offset"]
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = || Error::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        };
        let parsed = bytesize::parse(value).ok_or_else(invalid);
        match name {
            "min_free_mem" => self.min_free = parsed?,
            "hysteresis_offset" => self.hysteresis = parsed?,
            _ => return Err(invalid()),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "min_free_mem" => Some(bytesize::format(self.min_free)),
            "hysteresis_offset" => Some(bytesize::format(self.hysteresis)),
            _ => None,
        }
    }

    fn reclaim_target(&self, usage: &MemoryUsage) -> u64 {
        if usage.free_system >= self.min_free {
            return 0;
        }
        self.min_free
            .saturating_add(self.hysteresis)
            .saturating_sub(usage.free_system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(free_system: u64) -> MemoryUsage {
        MemoryUsage {
            total_resident: u64::MAX,
            total_dumped: 0,
            free_system,
        }
    }

    #[test]
    fn test_above_mark_reclaims_nothing() {
        let policy = ValveDump::new(100, 50);
        assert_eq!(policy.reclaim_target(&usage(100)), 0);
        assert_eq!(policy.reclaim_target(&usage(1000)), 0);
    }

    #[test]
    fn test_below_mark_reclaims_past_hysteresis() {
        let policy = ValveDump::new(100, 50);
        // 80 free, target 150: reclaim 70.
        assert_eq!(policy.reclaim_target(&usage(80)), 70);
        // Exactly at the mark minus one.
        assert_eq!(policy.reclaim_target(&usage(99)), 51);
    }

    #[test]
    fn test_single_dump_covers_target() {
        // Two 100 MB buffers, min_free = 150 MB, no hysteresis, 80 MB free:
        // the target is 70 MB, so dumping a single 100 MB buffer satisfies it.
        let mb = 1024 * 1024;
        let policy = ValveDump::new(150 * mb, 0);
        let target = policy.reclaim_target(&usage(80 * mb));
        assert_eq!(target, 70 * mb);
        assert!(100 * mb >= target);
    }

    #[test]
    fn test_parameters() {
        let mut policy = ValveDump::default();
        assert_eq!(
            policy.parameter_names(),
            ["min_free_mem", "hysteresis_offset"]
        );
        assert!(policy.set_parameter("min_free_memes", "1B").is_err());
        assert!(policy.set_parameter("min_free_mem", "-1B").is_err());
        assert!(policy.set_parameter("hysteresis_offset", "nope").is_err());
        policy.set_parameter("min_free_mem", "2B").unwrap();
        policy.set_parameter("hysteresis_offset", "1B").unwrap();
        assert_eq!(policy.min_free(), 2);
        assert_eq!(policy.hysteresis(), 1);
    }
}

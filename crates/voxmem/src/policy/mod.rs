//! Dump (eviction) policies.
//!
//! A [`DumpPolicy`] is consulted by the manager whenever global memory
//! usage may have changed: after allocations, resizes, lock acquisitions
//! and releases, and when the policy itself is swapped in. The policy
//! answers with the number of bytes the manager should try to reclaim;
//! the manager then dumps unlocked, stream-backed buffers in
//! least-recently-touched order until the target is met or no candidate
//! remains.
//!
//! # Policies
//!
//! | Name      | Behavior                                               |
//! |-----------|--------------------------------------------------------|
//! | `never`   | No automatic eviction                                  |
//! | `always`  | Evict everything evictable at every consultation       |
//! | `barrier` | Keep total resident bytes under a configured barrier   |
//! | `valve`   | Low-water mark on free system memory, with hysteresis  |

mod always;
mod barrier;
mod never;
mod valve;

pub use always::AlwaysDump;
pub use barrier::BarrierDump;
pub use never::NeverDump;
pub use valve::ValveDump;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of global memory state handed to a policy at consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Sum of the sizes of all resident buffers.
    pub total_resident: u64,
    /// Sum of the sizes of all dumped buffers.
    pub total_dumped: u64,
    /// Free system memory as reported by the manager's probe.
    pub free_system: u64,
}

/// Strategy deciding when and how much buffer memory to evict.
///
/// Implementations must be cheap to consult: they are invoked under the
/// manager's write lock.
pub trait DumpPolicy: Send + Sync {
    /// Stable identifier used by configuration (`"valve"`, `"never"`, ...).
    fn name(&self) -> &'static str;

    /// Names of the parameters this policy accepts.
    fn parameter_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Sets a parameter from its configuration string (a byte quantity
    /// such as `"512M"`).
    fn set_parameter(&mut self, name: &str, value: &str) -> Result<()> {
        Err(Error::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Returns the current value of a parameter, formatted.
    fn parameter(&self, _name: &str) -> Option<String> {
        None
    }

    /// Number of bytes the manager should try to reclaim right now.
    ///
    /// Zero means no eviction. The manager treats the value as a target,
    /// not a promise: it stops early when candidates run out.
    fn reclaim_target(&self, usage: &MemoryUsage) -> u64;
}

/// Named dump policy configuration, as supplied by service wiring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpPolicyConfig {
    /// Policy identifier: `never`, `always`, `barrier` or `valve`.
    pub policy: String,
    /// Parameter values, keyed by parameter name.
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Builds a dump policy from its named configuration.
///
/// # Errors
///
/// Returns [`Error::UnknownPolicy`] for an unrecognized identifier and
/// [`Error::InvalidParameter`] for a rejected parameter.
pub fn build_policy(config: &DumpPolicyConfig) -> Result<Box<dyn DumpPolicy>> {
    let mut policy: Box<dyn DumpPolicy> = match config.policy.as_str() {
        "never" => Box::new(NeverDump),
        "always" => Box::new(AlwaysDump),
        "barrier" => Box::new(BarrierDump::default()),
        "valve" => Box::new(ValveDump::default()),
        other => return Err(Error::UnknownPolicy(other.to_string())),
    };

    for (name, value) in &config.params {
        policy.set_parameter(name, value)?;
    }

    Ok(policy)
}

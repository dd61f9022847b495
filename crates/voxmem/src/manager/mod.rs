//! The process-wide buffer manager.
//!
//! The manager tracks every [`crate::handle::BufferObject`] through a
//! registry of weak entries, aggregates global memory counters, and
//! drives the active [`DumpPolicy`]. All shared state sits behind one
//! coarse read/write lock: registration, dump, restore, lock-count
//! changes and policy swaps take the write lock, so an eviction scan can
//! never observe a buffer halfway into a pin. Dump and restore of the
//! same buffer are therefore mutually exclusive by construction.
//!
//! # Eviction ordering
//!
//! Candidates are dumped least-recently-touched first. Buffers that share
//! a `last_touched` value are dumped in creation order ([`BufferId`]s are
//! monotonic), which keeps eviction deterministic.

mod stats;

pub use stats::BufferStats;

use crate::alloc::{AllocationPolicy, ForeignRegion, Memory, PolicyKind};
use crate::error::{Error, Result};
use crate::handle::{BufferCell, CellState, Residency};
use crate::policy::{DumpPolicy, DumpPolicyConfig, MemoryUsage};
use crate::probe::{MemoryProbe, SystemProbe};
use crate::stream::{StorageKey, StreamFactory};
use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};

/// Manager-assigned identity of a buffer. Monotonic within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When the content of a lazily backed buffer is materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadingMode {
    /// Content is restored on first lock.
    #[default]
    Lazy,
    /// Content is restored as soon as the stream factory is attached.
    Direct,
}

/// Configuration for a [`BufferManager`].
pub struct BufferManagerConfig {
    /// Source of the free-system-memory signal handed to dump policies.
    pub probe: Arc<dyn MemoryProbe>,
    /// When lazily backed buffers are materialized.
    pub loading_mode: LoadingMode,
    /// Initially active dump policy, if any. Without one, no automatic
    /// eviction occurs.
    pub dump_policy: Option<Box<dyn DumpPolicy>>,
}

impl Default for BufferManagerConfig {
    fn default() -> Self {
        Self {
            probe: Arc::new(SystemProbe),
            loading_mode: LoadingMode::default(),
            dump_policy: None,
        }
    }
}

impl fmt::Debug for BufferManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferManagerConfig")
            .field("loading_mode", &self.loading_mode)
            .field(
                "dump_policy",
                &self.dump_policy.as_ref().map(|p| p.name()),
            )
            .finish()
    }
}

/// Stream backing of one buffer: where its bytes go when dumped and come
/// from when restored.
#[derive(Clone)]
struct StreamBacking {
    factory: Arc<dyn StreamFactory>,
    key: StorageKey,
}

/// Registry entry for one buffer. The cell reference is weak: the handle
/// owns its memory, the manager only observes and orchestrates.
struct BufferInfo {
    cell: Weak<BufferCell>,
    size: u64,
    residency: Residency,
    lock_count: u64,
    last_touched: u64,
    backing: Option<StreamBacking>,
    policy_kind: PolicyKind,
}

struct ManagerState {
    registry: HashMap<BufferId, BufferInfo>,
    /// Sum of the sizes of all resident buffers.
    total_allocated: u64,
    dump_policy: Option<Box<dyn DumpPolicy>>,
    /// Monotonic touch counter; drives least-recently-used ordering.
    clock: u64,
    next_id: u64,
}

/// Registry and eviction driver for all managed buffers.
///
/// Usually accessed through [`BufferManager::global`], but tests and
/// embedders can construct isolated instances with their own probe and
/// policy.
pub struct BufferManager {
    state: RwLock<ManagerState>,
    probe: Arc<dyn MemoryProbe>,
    loading_mode: LoadingMode,
}

impl BufferManager {
    /// Creates a manager from its configuration.
    pub fn new(config: BufferManagerConfig) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(ManagerState {
                registry: HashMap::new(),
                total_allocated: 0,
                dump_policy: config.dump_policy,
                clock: 0,
                next_id: 0,
            }),
            probe: config.probe,
            loading_mode: config.loading_mode,
        })
    }

    /// Creates a manager with the default configuration: system memory
    /// probe, lazy loading, no dump policy.
    pub fn with_defaults() -> Arc<Self> {
        Self::new(BufferManagerConfig::default())
    }

    /// The process-wide manager instance, created on first use.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<BufferManager>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(Self::with_defaults))
    }

    // ---- policy management -------------------------------------------------

    /// Swaps the process-wide dump policy and consults it immediately.
    ///
    /// Already-dumped buffers stay dumped; they are restored normally
    /// regardless of which policy is active.
    pub fn set_dump_policy(&self, policy: Box<dyn DumpPolicy>) {
        let mut state = self.state.write();
        debug!(policy = policy.name(), "dump policy swapped");
        state.dump_policy = Some(policy);
        self.consult_locked(&mut state);
    }

    /// Builds and installs a dump policy from its named configuration.
    pub fn configure_dump_policy(&self, config: &DumpPolicyConfig) -> Result<()> {
        let policy = crate::policy::build_policy(config)?;
        self.set_dump_policy(policy);
        Ok(())
    }

    /// Disables automatic eviction.
    pub fn clear_dump_policy(&self) {
        self.state.write().dump_policy = None;
    }

    /// Name of the active dump policy, if any.
    #[must_use]
    pub fn dump_policy_name(&self) -> Option<&'static str> {
        self.state.read().dump_policy.as_ref().map(|p| p.name())
    }

    // ---- queries ------------------------------------------------------------

    /// Sum of the sizes of all resident buffers.
    #[must_use]
    pub fn total_allocated(&self) -> u64 {
        self.state.read().total_allocated
    }

    /// Aggregate statistics over all managed buffers.
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        let state = self.state.read();
        let mut stats = BufferStats::default();
        for info in state.registry.values() {
            stats.total_managed += info.size;
            match info.residency {
                Residency::Resident => stats.resident_count += 1,
                Residency::Dumped => {
                    stats.total_dumped += info.size;
                    stats.dumped_count += 1;
                }
                Residency::Empty => {}
            }
        }
        stats
    }

    pub(crate) fn size_of(&self, id: BufferId) -> u64 {
        self.state
            .read()
            .registry
            .get(&id)
            .map_or(0, |info| info.size)
    }

    pub(crate) fn residency_of(&self, id: BufferId) -> Residency {
        self.state
            .read()
            .registry
            .get(&id)
            .map_or(Residency::Empty, |info| info.residency)
    }

    pub(crate) fn lock_count_of(&self, id: BufferId) -> u64 {
        self.state
            .read()
            .registry
            .get(&id)
            .map_or(0, |info| info.lock_count)
    }

    // ---- registration -------------------------------------------------------

    pub(crate) fn register(&self, policy: Arc<dyn AllocationPolicy>) -> Arc<BufferCell> {
        let mut state = self.state.write();
        state.next_id += 1;
        state.clock += 1;
        let id = BufferId(state.next_id);
        let clock = state.clock;
        let kind = policy.kind();
        let cell = Arc::new(BufferCell {
            id,
            state: RwLock::new(CellState {
                memory: None,
                policy,
            }),
        });
        state.registry.insert(
            id,
            BufferInfo {
                cell: Arc::downgrade(&cell),
                size: 0,
                residency: Residency::Empty,
                lock_count: 0,
                last_touched: clock,
                backing: None,
                policy_kind: kind,
            },
        );
        cell
    }

    pub(crate) fn unregister(&self, cell: &Arc<BufferCell>) {
        let mut state = self.state.write();
        if let Some(info) = state.registry.remove(&cell.id) {
            if info.lock_count > 0 {
                warn!(
                    buffer = %cell.id,
                    locks = info.lock_count,
                    "buffer dropped with outstanding locks"
                );
            }
            if info.residency == Residency::Resident {
                state.total_allocated = state.total_allocated.saturating_sub(info.size);
            }
        }
        self.consult_locked(&mut state);
    }

    // ---- size-changing operations --------------------------------------------

    pub(crate) fn allocate(&self, cell: &Arc<BufferCell>, size: u64) -> Result<()> {
        let mut state = self.state.write();
        let (lock_count, old_resident_size) = {
            let info = state.registry.get(&cell.id).ok_or(Error::NotRegistered)?;
            let old = if info.residency == Residency::Resident {
                info.size
            } else {
                0
            };
            (info.lock_count, old)
        };
        if lock_count > 0 {
            return Err(Error::BufferLocked);
        }

        {
            let mut cell_state = cell.state.write();
            let policy = Arc::clone(&cell_state.policy);
            let new_memory = policy.allocate(size)?;
            let old = std::mem::replace(&mut cell_state.memory, new_memory);
            if let Some(old) = old {
                if let Err(e) = policy.destroy(old) {
                    warn!(buffer = %cell.id, error = %e, "failed to release replaced memory");
                }
            }
        }

        self.commit_size(&mut state, cell.id, old_resident_size, size);
        self.consult_locked(&mut state);
        Ok(())
    }

    pub(crate) fn reallocate(&self, cell: &Arc<BufferCell>, new_size: u64) -> Result<()> {
        let mut state = self.state.write();
        let (lock_count, residency, old_resident_size, kind) = {
            let info = state.registry.get(&cell.id).ok_or(Error::NotRegistered)?;
            let old = if info.residency == Residency::Resident {
                info.size
            } else {
                0
            };
            (info.lock_count, info.residency, old, info.policy_kind)
        };
        if lock_count > 0 {
            return Err(Error::BufferLocked);
        }

        if residency == Residency::Dumped {
            // The capability contract applies even while the bytes are
            // dumped: resizing restores through the regular allocate path.
            if !cell.state.read().policy.can_reallocate() {
                return Err(Error::UnsupportedOperation {
                    operation: "reallocate",
                    policy: kind,
                });
            }
            self.restore_locked(&mut state, cell.id, Some(new_size))?;
        } else {
            {
                let mut cell_state = cell.state.write();
                let policy = Arc::clone(&cell_state.policy);
                policy.reallocate(&mut cell_state.memory, new_size)?;
            }
            self.commit_size(&mut state, cell.id, old_resident_size, new_size);
        }

        self.consult_locked(&mut state);
        Ok(())
    }

    pub(crate) fn destroy(&self, cell: &Arc<BufferCell>) -> Result<()> {
        let mut state = self.state.write();
        let (lock_count, residency, size) = {
            let info = state.registry.get(&cell.id).ok_or(Error::NotRegistered)?;
            (info.lock_count, info.residency, info.size)
        };
        if lock_count > 0 {
            return Err(Error::BufferLocked);
        }

        match residency {
            Residency::Empty => return Ok(()),
            Residency::Resident => {
                let policy = Arc::clone(&cell.state.read().policy);
                if policy.kind() == PolicyKind::NoAlloc {
                    return Err(Error::UnsupportedOperation {
                        operation: "destroy",
                        policy: PolicyKind::NoAlloc,
                    });
                }
                if let Some(memory) = cell.state.write().memory.take() {
                    policy.destroy(memory)?;
                }
                state.total_allocated = state.total_allocated.saturating_sub(size);
            }
            // Dumped bytes live only in the backing; abandon them.
            Residency::Dumped => {}
        }

        state.clock += 1;
        let clock = state.clock;
        if let Some(info) = state.registry.get_mut(&cell.id) {
            info.size = 0;
            info.residency = Residency::Empty;
            info.backing = None;
            info.last_touched = clock;
        }
        self.consult_locked(&mut state);
        Ok(())
    }

    pub(crate) fn set_bytes(&self, cell: &Arc<BufferCell>, bytes: Vec<u8>) -> Result<()> {
        let mut state = self.state.write();
        let (lock_count, old_resident_size, kind) = {
            let info = state.registry.get(&cell.id).ok_or(Error::NotRegistered)?;
            let old = if info.residency == Residency::Resident {
                info.size
            } else {
                0
            };
            (info.lock_count, old, info.policy_kind)
        };
        if lock_count > 0 {
            return Err(Error::BufferLocked);
        }
        if kind == PolicyKind::NoAlloc {
            return Err(Error::UnsupportedOperation {
                operation: "set_bytes",
                policy: kind,
            });
        }

        let size = bytes.len() as u64;
        {
            let mut cell_state = cell.state.write();
            let policy = Arc::clone(&cell_state.policy);
            let new_memory = if bytes.is_empty() {
                None
            } else {
                Some(Memory::Owned(bytes.into_boxed_slice()))
            };
            let old = std::mem::replace(&mut cell_state.memory, new_memory);
            if let Some(old) = old {
                if let Err(e) = policy.destroy(old) {
                    warn!(buffer = %cell.id, error = %e, "failed to release replaced memory");
                }
            }
        }

        self.commit_size(&mut state, cell.id, old_resident_size, size);
        self.consult_locked(&mut state);
        Ok(())
    }

    pub(crate) fn set_foreign(
        &self,
        cell: &Arc<BufferCell>,
        region: Box<dyn ForeignRegion>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let (lock_count, old_resident_size, kind) = {
            let info = state.registry.get(&cell.id).ok_or(Error::NotRegistered)?;
            let old = if info.residency == Residency::Resident {
                info.size
            } else {
                0
            };
            (info.lock_count, old, info.policy_kind)
        };
        if lock_count > 0 {
            return Err(Error::BufferLocked);
        }
        if kind != PolicyKind::NoAlloc {
            return Err(Error::UnsupportedOperation {
                operation: "set_foreign",
                policy: kind,
            });
        }

        let size = region.len() as u64;
        {
            let mut cell_state = cell.state.write();
            let new_memory = if size == 0 {
                None
            } else {
                Some(Memory::Foreign(region))
            };
            // Only the previous wrapper is dropped here; foreign storage
            // stays with its real owner.
            let _old = std::mem::replace(&mut cell_state.memory, new_memory);
        }

        self.commit_size(&mut state, cell.id, old_resident_size, size);
        self.consult_locked(&mut state);
        Ok(())
    }

    pub(crate) fn set_stream_factory(
        &self,
        cell: &Arc<BufferCell>,
        factory: Arc<dyn StreamFactory>,
        key: StorageKey,
        size: u64,
    ) -> Result<()> {
        let mut state = self.state.write();
        let residency = state
            .registry
            .get(&cell.id)
            .ok_or(Error::NotRegistered)?
            .residency;

        state.clock += 1;
        let clock = state.clock;
        {
            let info = state.registry.get_mut(&cell.id).ok_or(Error::NotRegistered)?;
            info.backing = Some(StreamBacking { factory, key });
            info.last_touched = clock;
            match residency {
                // The declared size only matters while the bytes are not
                // resident; a resident buffer keeps its actual size, and a
                // zero size on a dumped buffer keeps the recorded one.
                Residency::Resident => {}
                Residency::Dumped => {
                    if size > 0 {
                        info.size = size;
                    }
                }
                Residency::Empty => {
                    if size > 0 {
                        info.size = size;
                        info.residency = Residency::Dumped;
                    }
                }
            }
        }

        if residency == Residency::Empty && size > 0 && self.loading_mode == LoadingMode::Direct {
            self.restore_locked(&mut state, cell.id, None)?;
        }

        self.consult_locked(&mut state);
        Ok(())
    }

    pub(crate) fn swap(
        &self,
        a: &Arc<BufferCell>,
        b: &Arc<BufferCell>,
        other_manager: &Arc<BufferManager>,
    ) -> Result<()> {
        if !std::ptr::eq(self, Arc::as_ptr(other_manager)) {
            return Err(Error::NotRegistered);
        }
        if a.id == b.id {
            return Ok(());
        }

        let mut state = self.state.write();
        {
            let info_a = state.registry.get(&a.id).ok_or(Error::NotRegistered)?;
            let info_b = state.registry.get(&b.id).ok_or(Error::NotRegistered)?;
            // A lock guarantees stable bytes, so a locked buffer cannot be
            // swapped out from under its holder.
            if info_a.lock_count > 0 || info_b.lock_count > 0 {
                return Err(Error::BufferLocked);
            }
        }

        {
            // Both buffers are unlocked, so no access guard can be holding
            // either cell; lock in id order anyway.
            let (first, second) = if a.id < b.id { (a, b) } else { (b, a) };
            let mut first_state = first.state.write();
            let mut second_state = second.state.write();
            std::mem::swap(&mut *first_state, &mut *second_state);
        }

        state.clock += 1;
        let clock = state.clock;
        let mut info_a = state.registry.remove(&a.id).ok_or(Error::NotRegistered)?;
        let mut info_b = state.registry.remove(&b.id).ok_or(Error::NotRegistered)?;
        std::mem::swap(&mut info_a.size, &mut info_b.size);
        std::mem::swap(&mut info_a.residency, &mut info_b.residency);
        std::mem::swap(&mut info_a.backing, &mut info_b.backing);
        std::mem::swap(&mut info_a.policy_kind, &mut info_b.policy_kind);
        info_a.last_touched = clock;
        info_b.last_touched = clock;
        state.registry.insert(a.id, info_a);
        state.registry.insert(b.id, info_b);

        self.consult_locked(&mut state);
        Ok(())
    }

    // ---- locking --------------------------------------------------------------

    pub(crate) fn lock(&self, cell: &Arc<BufferCell>) -> Result<()> {
        let mut state = self.state.write();
        let residency = state
            .registry
            .get(&cell.id)
            .ok_or(Error::NotRegistered)?
            .residency;
        match residency {
            Residency::Empty => return Err(Error::NotAllocated),
            Residency::Dumped => self.restore_locked(&mut state, cell.id, None)?,
            Residency::Resident => {}
        }

        state.clock += 1;
        let clock = state.clock;
        let info = state.registry.get_mut(&cell.id).ok_or(Error::NotRegistered)?;
        // The restore must have left the buffer resident; granting a pin
        // on anything else would break the lock-implies-resident rule.
        if info.residency != Residency::Resident {
            return Err(Error::NotAllocated);
        }
        info.lock_count += 1;
        info.last_touched = clock;
        self.consult_locked(&mut state);
        Ok(())
    }

    pub(crate) fn release_lock(&self, cell: &Arc<BufferCell>) {
        let mut state = self.state.write();
        if let Some(info) = state.registry.get_mut(&cell.id) {
            info.lock_count = info.lock_count.saturating_sub(1);
        }
        // A released lock makes the buffer dump-eligible again.
        self.consult_locked(&mut state);
    }

    // ---- dump & restore ---------------------------------------------------------

    /// Dumps one buffer explicitly.
    ///
    /// Returns `Ok(false)` when the buffer is not dumpable right now
    /// (locked, empty, already dumped, foreign memory, or no stream
    /// factory attached); the buffer stays resident in that case. I/O
    /// failures are surfaced and also leave the buffer resident.
    pub fn dump(&self, id: BufferId) -> Result<bool> {
        let mut state = self.state.write();
        if !state.registry.contains_key(&id) {
            return Err(Error::NotRegistered);
        }
        self.try_dump(&mut state, id)
    }

    /// Restores one dumped buffer explicitly.
    ///
    /// Returns `Ok(false)` when the buffer is not dumped.
    pub fn restore(&self, id: BufferId) -> Result<bool> {
        let mut state = self.state.write();
        let residency = state
            .registry
            .get(&id)
            .ok_or(Error::NotRegistered)?
            .residency;
        if residency != Residency::Dumped {
            return Ok(false);
        }
        self.restore_locked(&mut state, id, None)?;
        self.consult_locked(&mut state);
        Ok(true)
    }

    /// Writes the buffer's bytes to its backing and releases the memory.
    fn try_dump(&self, state: &mut ManagerState, id: BufferId) -> Result<bool> {
        let (size, backing, cell) = {
            let Some(info) = state.registry.get(&id) else {
                return Ok(false);
            };
            if info.residency != Residency::Resident
                || info.lock_count > 0
                || info.size == 0
                || info.policy_kind == PolicyKind::NoAlloc
            {
                return Ok(false);
            }
            let Some(backing) = info.backing.clone() else {
                debug!(buffer = %id, "not dumpable: no stream factory attached");
                return Ok(false);
            };
            let Some(cell) = info.cell.upgrade() else {
                return Ok(false);
            };
            (info.size, backing, cell)
        };

        // Write the content out first; the in-memory copy is only released
        // once the backing write is confirmed.
        {
            let cell_state = cell.state.read();
            let Some(memory) = cell_state.memory.as_ref() else {
                return Ok(false);
            };
            let mut writer = backing.factory.writer(&backing.key)?;
            writer.write_all(memory.as_slice())?;
            writer.flush()?;
        }

        let (memory, policy) = {
            let mut cell_state = cell.state.write();
            let memory = cell_state.memory.take();
            (memory, Arc::clone(&cell_state.policy))
        };
        if let Some(memory) = memory {
            if let Err(e) = policy.destroy(memory) {
                warn!(buffer = %id, error = %e, "allocation policy failed to release dumped memory");
            }
        }

        if let Some(info) = state.registry.get_mut(&id) {
            info.residency = Residency::Dumped;
        }
        state.total_allocated = state.total_allocated.saturating_sub(size);
        debug!(buffer = %id, size, key = %backing.key, "dumped buffer");
        Ok(true)
    }

    /// Reads a dumped buffer's bytes back from its backing.
    ///
    /// With `new_size` set, the buffer is restored into a region of that
    /// size, copying `min(old, new)` bytes (the resize-while-dumped path).
    fn restore_locked(
        &self,
        state: &mut ManagerState,
        id: BufferId,
        new_size: Option<u64>,
    ) -> Result<()> {
        let (old_size, backing, cell) = {
            let info = state.registry.get(&id).ok_or(Error::NotRegistered)?;
            let backing = info.backing.clone().ok_or(Error::NoStreamFactory)?;
            let cell = info.cell.upgrade().ok_or(Error::NotRegistered)?;
            (info.size, backing, cell)
        };
        let alloc_size = new_size.unwrap_or(old_size);
        let copy_len = old_size.min(alloc_size) as usize;

        {
            let mut cell_state = cell.state.write();
            let policy = Arc::clone(&cell_state.policy);
            let mut memory = policy.allocate(alloc_size)?;
            if let Some(memory) = memory.as_mut() {
                let mut reader =
                    backing
                        .factory
                        .reader(&backing.key)
                        .map_err(|e| Error::RestoreFailed {
                            key: backing.key.clone(),
                            source: e,
                        })?;
                reader
                    .read_exact(&mut memory.as_mut_slice()[..copy_len])
                    .map_err(|e| Error::RestoreFailed {
                        key: backing.key.clone(),
                        source: e,
                    })?;
            }
            cell_state.memory = memory;
        }

        state.clock += 1;
        let clock = state.clock;
        if let Some(info) = state.registry.get_mut(&id) {
            info.size = alloc_size;
            info.residency = if alloc_size > 0 {
                Residency::Resident
            } else {
                Residency::Empty
            };
            info.last_touched = clock;
        }
        state.total_allocated += alloc_size;
        debug!(buffer = %id, size = alloc_size, key = %backing.key, "restored buffer");
        Ok(())
    }

    // ---- eviction -----------------------------------------------------------------

    /// Consults the active dump policy and evicts until its reclaim
    /// target is met or candidates run out.
    fn consult_locked(&self, state: &mut ManagerState) {
        let target = {
            let Some(policy) = state.dump_policy.as_ref() else {
                return;
            };
            let total_dumped = state
                .registry
                .values()
                .filter(|info| info.residency == Residency::Dumped)
                .map(|info| info.size)
                .sum();
            let usage = MemoryUsage {
                total_resident: state.total_allocated,
                total_dumped,
                free_system: self.probe.free_system_memory(),
            };
            policy.reclaim_target(&usage)
        };
        if target == 0 {
            return;
        }

        let mut candidates: SmallVec<[(u64, BufferId, u64); 16]> = state
            .registry
            .iter()
            .filter(|(_, info)| {
                info.residency == Residency::Resident
                    && info.lock_count == 0
                    && info.size > 0
                    && info.backing.is_some()
                    && info.policy_kind != PolicyKind::NoAlloc
            })
            .map(|(id, info)| (info.last_touched, *id, info.size))
            .collect();
        // Least recently touched first; ids break ties in creation order.
        candidates.sort_unstable();

        let mut reclaimed: u64 = 0;
        for (_, id, size) in candidates {
            if reclaimed >= target {
                break;
            }
            match self.try_dump(state, id) {
                Ok(true) => reclaimed += size,
                Ok(false) => {}
                // Eviction is best-effort: a failed backing write leaves the
                // candidate resident and the scan moves on.
                Err(e) => warn!(buffer = %id, error = %e, "dump skipped: backing write failed"),
            }
        }
        if reclaimed < target {
            debug!(target, reclaimed, "reclaim target not met, out of candidates");
        }
    }

    /// Applies a size/residency change to the registry and the global
    /// counter, and bumps the touch clock.
    fn commit_size(
        &self,
        state: &mut ManagerState,
        id: BufferId,
        old_resident_size: u64,
        new_size: u64,
    ) {
        state.clock += 1;
        let clock = state.clock;
        if let Some(info) = state.registry.get_mut(&id) {
            info.size = new_size;
            info.residency = if new_size > 0 {
                Residency::Resident
            } else {
                Residency::Empty
            };
            info.last_touched = clock;
        }
        state.total_allocated = state
            .total_allocated
            .saturating_sub(old_resident_size)
            .saturating_add(new_size);
    }
}

impl fmt::Debug for BufferManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferManager")
            .field("stats", &self.stats())
            .field("loading_mode", &self.loading_mode)
            .field("dump_policy", &self.dump_policy_name())
            .finish()
    }
}

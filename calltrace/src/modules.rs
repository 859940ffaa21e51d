//! Module address-space tracker.
//!
//! Maintains, per process, the set of disjoint virtual-address ranges
//! occupied by loaded modules, so that an address observed later in the
//! stream can be mapped back to the module that owned it at the time.
//!
//! Unloads never delete eagerly. Trace buffers from different threads are
//! flushed out of temporal order, so a function-call record referring to an
//! unloaded module's range may still arrive after the unload; an eager
//! delete would make that lookup silently wrong. Instead an unload marks the
//! entry [`Liveness::Dirty`], and the entry is physically removed only when
//! a genuinely new module claims the same range (at which point the dirty
//! occupant is known stale) — or never, which is harmless.

use crate::domain::Pid;
use log::{debug, error};
use std::collections::{BTreeMap, HashMap};

/// Everything the tracker retains about one loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Base virtual address of the mapped range.
    pub base_address: u64,
    /// Size of the mapped range in bytes.
    pub size: u64,
    /// Path the module was loaded from, as the producer reported it.
    pub path: String,
    /// Image checksum.
    pub checksum: u32,
    /// Image link timestamp.
    pub timestamp: u32,
}

impl ModuleInfo {
    /// End of the mapped range, exclusive.
    #[must_use]
    pub fn end_address(&self) -> u64 {
        self.base_address.saturating_add(self.size)
    }

    /// Whether `other` describes the same module even though the producers
    /// reported it under different path-normalization conventions (device
    /// paths vs. drive letters for the same file).
    fn is_same_module(&self, other: &ModuleInfo) -> bool {
        self.base_address == other.base_address
            && self.checksum == other.checksum
            && self.size == other.size
            && self.timestamp == other.timestamp
            && base_name(&self.path) == base_name(&other.path)
    }
}

/// Lifecycle of a tracked module entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Loaded and not yet unloaded; at most one live entry may cover any
    /// address at any time.
    Live,
    /// Unload observed; retained for late out-of-order attribution and
    /// evicted lazily when a new load needs the range.
    Dirty,
}

#[derive(Debug, Clone)]
struct ModuleEntry {
    info: ModuleInfo,
    liveness: Liveness,
}

/// Address ranges mapped to modules for one process, keyed by range start.
///
/// Module counts per process are tens, not millions, so an ordered map
/// queried by "largest start ≤ address, then check the end" is all the
/// interval structure this needs.
#[derive(Debug, Default)]
pub struct ModuleSpace {
    ranges: BTreeMap<u64, ModuleEntry>,
}

impl ModuleSpace {
    /// Module whose range contains `addr`, dirty entries included.
    #[must_use]
    pub fn lookup(&self, addr: u64) -> Option<&ModuleInfo> {
        self.entry_at(addr).map(|(info, _)| info)
    }

    /// Like [`Self::lookup`], with the entry's liveness.
    #[must_use]
    pub fn entry_at(&self, addr: u64) -> Option<(&ModuleInfo, Liveness)> {
        let (_, entry) = self.ranges.range(..=addr).next_back()?;
        (entry.info.end_address() > addr).then_some((&entry.info, entry.liveness))
    }

    /// Number of tracked entries, dirty ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// First entry intersecting `[base, end)`, with its start key.
    fn find_overlap(&self, base: u64, end: u64) -> Option<(u64, &ModuleEntry)> {
        if let Some((key, entry)) = self.ranges.range(..=base).next_back() {
            if entry.info.end_address() > base {
                return Some((*key, entry));
            }
        }
        self.ranges.range(base..end).next().map(|(key, entry)| (*key, entry))
    }
}

/// Per-process module address spaces with lazy-eviction conflict handling.
#[derive(Debug)]
pub struct ModuleMap {
    processes: HashMap<Pid, ModuleSpace>,
    fail_on_conflict: bool,
}

impl ModuleMap {
    /// `fail_on_conflict` selects strict behavior for the map's whole
    /// lifetime: genuine module conflicts and mismatched-range unloads
    /// become failures instead of logged-and-swallowed anomalies.
    #[must_use]
    pub fn new(fail_on_conflict: bool) -> Self {
        Self { processes: HashMap::new(), fail_on_conflict }
    }

    /// Module owning `addr` in process `pid`, or `None`. Read-only; dirty
    /// entries still resolve so late events keep attributing correctly.
    #[must_use]
    pub fn lookup(&self, pid: Pid, addr: u64) -> Option<&ModuleInfo> {
        self.processes.get(&pid)?.lookup(addr)
    }

    /// Like [`Self::lookup`], with the entry's liveness.
    #[must_use]
    pub fn lookup_entry(&self, pid: Pid, addr: u64) -> Option<(&ModuleInfo, Liveness)> {
        self.processes.get(&pid)?.entry_at(addr)
    }

    /// The tracked address space of one process, if any module load has
    /// been observed for it.
    #[must_use]
    pub fn process_space(&self, pid: Pid) -> Option<&ModuleSpace> {
        self.processes.get(&pid)
    }

    /// Record a module load.
    ///
    /// Zero-size or empty-path records are tolerated as no-ops; some
    /// producers emit them with conflicting content. Re-announcements of a
    /// module already tracked under a different path convention succeed
    /// without mutating. Dirty occupants of the range are evicted and the
    /// insert retried. A genuine conflict with a live module is logged and
    /// fails only under the fail-on-conflict policy (the older mapping is
    /// kept either way).
    pub fn insert(&mut self, pid: Pid, info: ModuleInfo) -> bool {
        if info.size == 0 || info.path.is_empty() {
            return true;
        }

        let space = self.processes.entry(pid).or_default();
        let base = info.base_address;
        let end = info.end_address();

        loop {
            let Some((key, existing)) = space.find_overlap(base, end) else {
                space.ranges.insert(base, ModuleEntry { info, liveness: Liveness::Live });
                return true;
            };

            if existing.info.is_same_module(&info) {
                // Same file announced twice under different path
                // conventions; keep the original entry.
                return true;
            }

            if existing.liveness == Liveness::Dirty {
                // Stale occupant from an unload or a reused process id;
                // safe to discard now that a new module claims the range.
                space.ranges.remove(&key);
                continue;
            }

            error!(
                "Conflicting module info for {pid}: {} (base=0x{base:x}, size={}) and {} \
                 (base=0x{:x}, size={})",
                info.path,
                info.size,
                existing.info.path,
                existing.info.base_address,
                existing.info.size,
            );
            return !self.fail_on_conflict;
        }
    }

    /// Record a module unload by marking the overlapping entry dirty.
    ///
    /// Nothing is deleted here; see the module docs for why. Zero-size or
    /// empty-path records and unloads with no overlapping entry succeed
    /// silently (certain modules fire multiple unload notifications). An
    /// overlap whose range does not exactly match is logged and fails only
    /// under the fail-on-conflict policy.
    pub fn remove(&mut self, pid: Pid, info: &ModuleInfo) -> bool {
        if info.size == 0 || info.path.is_empty() {
            return true;
        }

        let Some(space) = self.processes.get_mut(&pid) else {
            return true;
        };
        let Some((key, existing)) = space.find_overlap(info.base_address, info.end_address())
        else {
            debug!("Unload for untracked module {} in {pid}", info.path);
            return true;
        };

        if existing.info.base_address != info.base_address || existing.info.size != info.size {
            error!(
                "Trying to remove module with mismatching range: {} (base=0x{:x}, size={})",
                info.path, info.base_address, info.size,
            );
            if self.fail_on_conflict {
                return false;
            }
        }

        // The key came out of the map one borrow ago.
        let Some(entry) = space.ranges.get_mut(&key) else {
            unreachable!("overlap entry vanished between lookup and update");
        };
        entry.liveness = Liveness::Dirty;
        true
    }

    /// Mark every module of a terminated process dirty, so a reused process
    /// id starts from a cleanly evictable slate.
    pub fn remove_process(&mut self, pid: Pid) -> bool {
        let Some(space) = self.processes.get_mut(&pid) else {
            error!("Unknown process id: {pid}");
            return false;
        };
        for entry in space.ranges.values_mut() {
            entry.liveness = Liveness::Dirty;
        }
        true
    }
}

/// Final path component under either separator convention; producers report
/// the same file as `C:\x\foo.dll` or `\Device\HarddiskVolume1\x\foo.dll`.
fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

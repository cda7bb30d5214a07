#![deny(unsafe_code)]

//! Interfaces the invigilator consumes from the process-management host,
//! together with the host implementations shipped with the crate.

mod exemption;
mod procfs_process;
mod region_map;
mod scheduler;
mod sink;
mod sparse_memory;

pub use exemption::{ExemptionList, NoExemption};
pub use procfs_process::{LiveProcess, RemoteMemory};
pub use region_map::{RegionMap, RegionTable, RegionsReadGuard};
pub use scheduler::{NiceTable, Renicer};
pub use sink::TracingSink;
pub use sparse_memory::SparseMemory;

use crate::domain::{MemoryRegion, ProcessIdentity};
use crate::error::Error;
use crate::report::Violation;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Ordered, read-only view of a process' regions.
///
/// A view is only ever handed out while the region map's shared lock is
/// held, so the regions it returns cannot change underneath the caller.
pub trait RegionView {
    /// First region, in ascending address order, whose end lies above `addr`.
    fn find_from(&self, addr: u64) -> Option<MemoryRegion>;
    /// Region following `region`.
    fn next(&self, region: &MemoryRegion) -> Option<MemoryRegion>;
    /// Region preceding `region`.
    fn prev(&self, region: &MemoryRegion) -> Option<MemoryRegion>;

    fn region_containing(&self, addr: u64) -> Option<MemoryRegion> {
        self.find_from(addr).filter(|region| region.contains(addr))
    }
}

/// Lock-protected region map of one process.
pub trait AddressSpace: Send + Sync {
    /// Take the shared lock, blocking until granted. Dropping the returned
    /// view releases it.
    fn lock_shared(&self) -> Box<dyn RegionView + '_>;

    /// Take the shared lock unless `signal` becomes pending while waiting.
    fn lock_shared_killable(&self, signal: &FatalSignal)
    -> Result<Box<dyn RegionView + '_>, Error>;

    /// Exclusive upper bound of user addresses.
    fn max_address(&self) -> u64 {
        u64::MAX
    }
}

/// Fault tolerant access to user memory.
pub trait MemoryAccessor: Send + Sync {
    /// Read one byte, or `None` if the access faults.
    fn try_read_byte(&self, addr: u64) -> Option<u8>;
}

pub trait ExemptionPolicy: Send + Sync {
    /// Whether the process holds the exemption capability.
    fn is_exempt(&self, process: &ProcessIdentity) -> bool;
}

pub trait Scheduler: Send + Sync {
    /// Add `delta` to the niceness of `process`. Best effort: failures are
    /// handled by the implementation.
    fn adjust_priority_hint(&self, process: &ProcessIdentity, delta: i32);
}

pub trait ViolationSink: Send + Sync {
    fn emit(&self, violation: &Violation);
}

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn adjust_priority_hint(&self, process: &ProcessIdentity, delta: i32) {
        (**self).adjust_priority_hint(process, delta);
    }
}

impl<T: ViolationSink + ?Sized> ViolationSink for Arc<T> {
    fn emit(&self, violation: &Violation) {
        (**self).emit(violation);
    }
}

/// How the caller stands with respect to the region map lock.
#[derive(Clone, Copy)]
pub enum LockContext<'a> {
    /// The scan takes the shared lock itself.
    Acquire { killable: bool },
    /// The caller already holds the lock and lends its view. Taking the lock
    /// again could deadlock behind a queued writer.
    Held(&'a dyn RegionView),
}

/// Pending fatal signal flag of one process.
///
/// Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct FatalSignal(Arc<AtomicBool>);

impl FatalSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

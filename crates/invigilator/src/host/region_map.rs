#![forbid(unsafe_code)]

use super::{AddressSpace, FatalSignal, RegionView};
use crate::domain::MemoryRegion;
use crate::error::Error;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Duration;
use tracing::trace;

/// How often a killable waiter looks at its fatal signal flag.
const KILLABLE_POLL: Duration = Duration::from_millis(10);

/// Non-overlapping regions keyed by start address.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegionTable {
    regions: BTreeMap<u64, MemoryRegion>,
}

impl RegionTable {
    pub fn insert(&mut self, region: MemoryRegion) -> Result<(), Error> {
        if region.is_empty() {
            return Err(Error::InvalidRange {
                start: region.start,
                end: region.end,
            });
        }
        // Only the last region starting below our end can reach into us.
        if let Some((_, prev)) = self.regions.range(..region.end).next_back() {
            if prev.overlaps(&region) {
                return Err(Error::RegionOverlap {
                    start: region.start,
                    end: region.end,
                });
            }
        }
        self.regions.insert(region.start, region);
        Ok(())
    }

    /// Remove `[hole.start, hole.end)` from the table, splitting regions that
    /// straddle its edges.
    pub fn unmap(&mut self, hole: MemoryRegion) {
        let doomed: Vec<MemoryRegion> = self
            .regions
            .values()
            .filter(|region| region.overlaps(&hole))
            .copied()
            .collect();
        for region in doomed {
            self.regions.remove(&region.start);
            if region.start < hole.start {
                let left = MemoryRegion::new(region.start, hole.start);
                self.regions.insert(left.start, left);
            }
            if hole.end < region.end {
                let right = MemoryRegion::new(hole.end, region.end);
                self.regions.insert(right.start, right);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryRegion> {
        self.regions.values()
    }
}

impl RegionView for RegionTable {
    fn find_from(&self, addr: u64) -> Option<MemoryRegion> {
        if let Some((_, region)) = self.regions.range(..=addr).next_back() {
            if region.end > addr {
                return Some(*region);
            }
        }
        self.regions
            .range((Bound::Excluded(addr), Bound::Unbounded))
            .next()
            .map(|(_, region)| *region)
    }

    fn next(&self, region: &MemoryRegion) -> Option<MemoryRegion> {
        self.regions
            .range((Bound::Excluded(region.start), Bound::Unbounded))
            .next()
            .map(|(_, region)| *region)
    }

    fn prev(&self, region: &MemoryRegion) -> Option<MemoryRegion> {
        self.regions
            .range(..region.start)
            .next_back()
            .map(|(_, region)| *region)
    }
}

/// Shared-lock guard over a [`RegionTable`]. The lock is released on drop.
pub struct RegionsReadGuard<'a>(RwLockReadGuard<'a, RegionTable>);

impl RegionView for RegionsReadGuard<'_> {
    fn find_from(&self, addr: u64) -> Option<MemoryRegion> {
        self.0.find_from(addr)
    }

    fn next(&self, region: &MemoryRegion) -> Option<MemoryRegion> {
        self.0.next(region)
    }

    fn prev(&self, region: &MemoryRegion) -> Option<MemoryRegion> {
        self.0.prev(region)
    }
}

impl std::ops::Deref for RegionsReadGuard<'_> {
    type Target = RegionTable;

    fn deref(&self) -> &RegionTable {
        &self.0
    }
}

/// Region map of one process guarded by a read/write lock.
///
/// Scans take the lock shared; mapping and unmapping take it exclusive.
#[derive(Debug)]
pub struct RegionMap {
    table: RwLock<RegionTable>,
    max_address: u64,
}

impl RegionMap {
    pub fn new(max_address: u64) -> Self {
        Self {
            table: RwLock::new(RegionTable::default()),
            max_address,
        }
    }

    pub fn with_regions(
        max_address: u64,
        regions: impl IntoIterator<Item = MemoryRegion>,
    ) -> Result<Self, Error> {
        let map = Self::new(max_address);
        map.replace_all(regions)?;
        Ok(map)
    }

    pub fn read(&self) -> RegionsReadGuard<'_> {
        RegionsReadGuard(self.table.read())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, RegionTable> {
        self.table.write()
    }

    pub fn map(&self, region: MemoryRegion) -> Result<(), Error> {
        self.write().insert(region)
    }

    pub fn unmap(&self, hole: MemoryRegion) {
        self.write().unmap(hole);
    }

    /// Swap the whole table in one exclusive section. On error the previous
    /// table is left untouched.
    pub fn replace_all(&self, regions: impl IntoIterator<Item = MemoryRegion>) -> Result<(), Error> {
        let mut fresh = RegionTable::default();
        for region in regions {
            fresh.insert(region)?;
        }
        *self.write() = fresh;
        Ok(())
    }
}

impl AddressSpace for RegionMap {
    fn lock_shared(&self) -> Box<dyn RegionView + '_> {
        Box::new(self.read())
    }

    fn lock_shared_killable(
        &self,
        signal: &FatalSignal,
    ) -> Result<Box<dyn RegionView + '_>, Error> {
        loop {
            if signal.is_pending() {
                trace!("fatal signal pending, giving up on region map lock");
                return Err(Error::Interrupted);
            }
            if let Some(guard) = self.table.try_read_for(KILLABLE_POLL) {
                return Ok(Box::new(RegionsReadGuard(guard)));
            }
        }
    }

    fn max_address(&self) -> u64 {
        self.max_address
    }
}

#![forbid(unsafe_code)]

use super::{MemoryAccessor, RegionMap};
use crate::domain::{MemoryRegion, ProcessIdentity};
use crate::error::Error;
use crate::state::ScannerState;
use crate::task::Task;
use nix::sys::uio::{RemoteIoVec, process_vm_readv};
use nix::unistd::Pid;
use parking_lot::Mutex;
use procfs::process::{MMPermissions, Process};
use std::io::IoSliceMut;
use std::sync::Arc;
use tracing::{debug, trace};

/// A running process observed through `/proc/<pid>`.
///
/// The region map is a snapshot of the readable mappings taken at attach
/// time; [`refresh`](Self::refresh) retakes it under the exclusive lock.
pub struct LiveProcess {
    process: Process,
    regions: Arc<RegionMap>,
    memory: Arc<RemoteMemory>,
}

impl LiveProcess {
    pub fn attach(pid: i32) -> Result<Self, Error> {
        let process = Process::new(pid)?;
        let regions = Arc::new(RegionMap::new(u64::MAX));
        let memory = Arc::new(RemoteMemory::new(pid));
        let live = Self {
            process,
            regions,
            memory,
        };
        live.refresh()?;
        Ok(live)
    }

    pub fn pid(&self) -> i32 {
        self.process.pid
    }

    pub fn identity(&self) -> Result<ProcessIdentity, Error> {
        let status = self.process.status()?;
        Ok(ProcessIdentity::new(status.name, self.process.pid)
            .with_uids(status.ruid, status.euid)
            .with_gids(status.rgid, status.egid)
            .with_capabilities(status.capeff))
    }

    /// Readable mappings of the process, in address order.
    pub fn readable_regions(&self) -> Result<Vec<MemoryRegion>, Error> {
        let maps = self.process.maps()?;
        let mut regions = Vec::new();
        for map in maps {
            if !map.perms.contains(MMPermissions::READ) {
                continue;
            }
            let (start, end) = map.address;
            if start < end {
                regions.push(MemoryRegion::new(start, end));
            }
        }
        Ok(regions)
    }

    /// Retake the map snapshot.
    pub fn refresh(&self) -> Result<(), Error> {
        let regions = self.readable_regions()?;
        let count = regions.len();
        self.regions.replace_all(regions)?;
        self.memory.invalidate();
        debug!(pid = self.process.pid, count, "region snapshot refreshed");
        Ok(())
    }

    pub fn regions(&self) -> &Arc<RegionMap> {
        &self.regions
    }

    /// Build the invigilated task for this process.
    pub fn task(&self, scanner: ScannerState) -> Result<Task, Error> {
        Ok(Task::new(
            self.identity()?,
            scanner,
            self.regions.clone(),
            self.memory.clone(),
        ))
    }
}

#[derive(Debug)]
struct CachedPage {
    base: u64,
    /// Shorter than a page when the tail of the page could not be read.
    bytes: Vec<u8>,
}

/// Byte reads from another process through `process_vm_readv`, one page at
/// a time.
#[derive(Debug)]
pub struct RemoteMemory {
    pid: Pid,
    page_size: u64,
    cache: Mutex<Option<CachedPage>>,
}

impl RemoteMemory {
    pub fn new(pid: i32) -> Self {
        Self {
            pid: Pid::from_raw(pid),
            page_size: procfs::page_size(),
            cache: Mutex::new(None),
        }
    }

    pub fn invalidate(&self) {
        self.cache.lock().take();
    }

    fn load(&self, base: u64) -> CachedPage {
        let mut bytes = vec![0u8; self.page_size as usize];
        let remote = [RemoteIoVec {
            base: base as usize,
            len: bytes.len(),
        }];
        let read = match process_vm_readv(self.pid, &mut [IoSliceMut::new(&mut bytes)], &remote)
        {
            Ok(read) => read,
            Err(err) => {
                trace!(pid = %self.pid, base, %err, "page read failed");
                0
            }
        };
        bytes.truncate(read);
        CachedPage { base, bytes }
    }
}

impl MemoryAccessor for RemoteMemory {
    fn try_read_byte(&self, addr: u64) -> Option<u8> {
        let base = addr - addr % self.page_size;
        let mut cache = self.cache.lock();
        let page = match cache.take() {
            Some(page) if page.base == base => page,
            _ => self.load(base),
        };
        let byte = page.bytes.get((addr - base) as usize).copied();
        *cache = Some(page);
        byte
    }
}

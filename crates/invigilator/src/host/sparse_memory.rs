#![forbid(unsafe_code)]

use super::MemoryAccessor;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
struct Backing {
    bytes: BTreeMap<u64, u8>,
    poisoned: BTreeSet<u64>,
}

/// Simulated user memory.
///
/// Reads of addresses that were never written, or that were poisoned, fault.
#[derive(Debug, Default)]
pub struct SparseMemory {
    backing: RwLock<Backing>,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` at `addr`, overwriting earlier contents.
    pub fn write(&self, addr: u64, bytes: &[u8]) {
        let mut backing = self.backing.write();
        for (offset, &byte) in bytes.iter().enumerate() {
            backing.bytes.insert(addr + offset as u64, byte);
        }
    }

    /// Fill `[addr, addr + len)` with `byte`.
    pub fn fill(&self, addr: u64, len: u64, byte: u8) {
        let mut backing = self.backing.write();
        for a in addr..addr + len {
            backing.bytes.insert(a, byte);
        }
    }

    /// Make reads of `addr` fault from now on.
    pub fn poison(&self, addr: u64) {
        self.backing.write().poisoned.insert(addr);
    }
}

impl MemoryAccessor for SparseMemory {
    fn try_read_byte(&self, addr: u64) -> Option<u8> {
        let backing = self.backing.read();
        if backing.poisoned.contains(&addr) {
            return None;
        }
        backing.bytes.get(&addr).copied()
    }
}

#![forbid(unsafe_code)]

use crate::domain::ProcessIdentity;
use crate::host::{AddressSpace, FatalSignal, MemoryAccessor};
use crate::state::ScannerState;
use std::fmt;
use std::sync::Arc;

/// One invigilated process: who it is, its scanner state, and the host
/// handles the scan engine needs to look at its memory.
///
/// A task is shared by all threads of the process, so scans of the same
/// process may run concurrently through one `&Task`.
pub struct Task {
    identity: ProcessIdentity,
    scanner: ScannerState,
    mm: Arc<dyn AddressSpace>,
    memory: Arc<dyn MemoryAccessor>,
    signal: FatalSignal,
}

impl Task {
    pub fn new(
        identity: ProcessIdentity,
        scanner: ScannerState,
        mm: Arc<dyn AddressSpace>,
        memory: Arc<dyn MemoryAccessor>,
    ) -> Self {
        Self {
            identity,
            scanner,
            mm,
            memory,
            signal: FatalSignal::new(),
        }
    }

    /// Duplicate this process.
    ///
    /// The child shares the word table, copies the padding, starts with no
    /// reports and has its own fatal signal flag.
    pub fn fork(
        &self,
        identity: ProcessIdentity,
        mm: Arc<dyn AddressSpace>,
        memory: Arc<dyn MemoryAccessor>,
    ) -> Self {
        Self::new(identity, self.scanner.derive_child(), mm, memory)
    }

    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }

    pub fn scanner(&self) -> &ScannerState {
        &self.scanner
    }

    pub fn mm(&self) -> &dyn AddressSpace {
        self.mm.as_ref()
    }

    pub fn memory(&self) -> &dyn MemoryAccessor {
        self.memory.as_ref()
    }

    pub fn fatal_signal(&self) -> &FatalSignal {
        &self.signal
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("identity", &self.identity)
            .field("scanner", &self.scanner)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

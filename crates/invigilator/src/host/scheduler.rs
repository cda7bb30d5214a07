#![deny(unsafe_code)]

use super::Scheduler;
use crate::domain::ProcessIdentity;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use tracing::{debug, warn};

const NICE_MIN: i32 = -20;
const NICE_MAX: i32 = 19;

/// In-memory niceness bookkeeping for hosts that keep their own scheduler
/// state. Unknown processes start at niceness 0.
#[derive(Debug, Default)]
pub struct NiceTable {
    nice: Mutex<HashMap<i32, i32>>,
}

impl NiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nice(&self, pid: i32) -> i32 {
        self.nice.lock().get(&pid).copied().unwrap_or(0)
    }

    pub fn set(&self, pid: i32, nice: i32) {
        self.nice.lock().insert(pid, nice.clamp(NICE_MIN, NICE_MAX));
    }
}

impl Scheduler for NiceTable {
    fn adjust_priority_hint(&self, process: &ProcessIdentity, delta: i32) {
        let mut table = self.nice.lock();
        let nice = table.entry(process.pid).or_insert(0);
        *nice = nice.saturating_add(delta).clamp(NICE_MIN, NICE_MAX);
        debug!(pid = process.pid, nice = *nice, "priority hint adjusted");
    }
}

/// Renices live processes through `getpriority`/`setpriority`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Renicer;

impl Renicer {
    /// Current niceness of `pid`.
    ///
    /// `getpriority()` can legitimately return -1, so errors are detected via
    /// errno rather than the return value (POSIX convention).
    pub fn nice(pid: i32) -> Result<i32, io::Error> {
        #[allow(unsafe_code)]
        unsafe {
            *libc::__errno_location() = 0;
        }

        #[allow(unsafe_code)]
        let ret = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) };

        #[allow(unsafe_code)]
        let errno = unsafe { *libc::__errno_location() };

        if errno != 0 {
            Err(io::Error::from_raw_os_error(errno))
        } else {
            Ok(ret)
        }
    }

    pub fn set_nice(pid: i32, nice: i32) -> Result<(), io::Error> {
        #[allow(unsafe_code)]
        let ret = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice) };

        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl Scheduler for Renicer {
    fn adjust_priority_hint(&self, process: &ProcessIdentity, delta: i32) {
        let result = Self::nice(process.pid).and_then(|nice| {
            let target = nice.saturating_add(delta).clamp(NICE_MIN, NICE_MAX);
            Self::set_nice(process.pid, target).map(|()| target)
        });
        match result {
            Ok(nice) => debug!(pid = process.pid, nice, "process reniced"),
            Err(err) => warn!(pid = process.pid, %err, delta, "failed to renice process"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_table_clamps_to_linux_range() {
        let table = NiceTable::new();
        let process = ProcessIdentity::new("victim", 7);
        table.set(7, 18);
        table.adjust_priority_hint(&process, 1);
        assert_eq!(table.nice(7), 19);
        table.adjust_priority_hint(&process, 1);
        assert_eq!(table.nice(7), 19);
        assert_eq!(table.nice(8), 0);
    }

    #[test]
    fn renicer_reads_own_niceness() {
        let pid = std::process::id() as i32;
        let nice = Renicer::nice(pid).unwrap();
        assert!((NICE_MIN..=NICE_MAX).contains(&nice));
    }
}

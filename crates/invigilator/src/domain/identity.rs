#![forbid(unsafe_code)]

use std::fmt;

/// Identity fields of a process, as they appear in a violation record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessIdentity {
    /// Short process name.
    pub comm: String,
    pub pid: i32,
    pub uid: u32,
    pub euid: u32,
    pub gid: u32,
    pub egid: u32,
    /// Effective capability set, one bit per capability number.
    pub cap_effective: u64,
}

impl ProcessIdentity {
    pub fn new(comm: impl Into<String>, pid: i32) -> Self {
        Self {
            comm: comm.into(),
            pid,
            uid: 0,
            euid: 0,
            gid: 0,
            egid: 0,
            cap_effective: 0,
        }
    }

    pub fn with_uids(mut self, uid: u32, euid: u32) -> Self {
        self.uid = uid;
        self.euid = euid;
        self
    }

    pub fn with_gids(mut self, gid: u32, egid: u32) -> Self {
        self.gid = gid;
        self.egid = egid;
        self
    }

    pub fn with_capabilities(mut self, cap_effective: u64) -> Self {
        self.cap_effective = cap_effective;
        self
    }

    pub fn has_capability(&self, capability: u8) -> bool {
        1u64.checked_shl(capability.into())
            .is_some_and(|bit| self.cap_effective & bit != 0)
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "COMM `{}' PID {} UID {} EUID {} GID {} EGID {}",
            self.comm, self.pid, self.uid, self.euid, self.gid, self.egid
        )
    }
}

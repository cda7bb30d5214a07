use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Scan {
    /// Bytes added on both sides of every requested range before it is
    /// scanned. Useful to catch words lying across the edge of a buffer
    /// that was handed to the invigilator.
    pub padding: u64,

    /// Effective user ids that are never invigilated.
    pub exempt_uids: Vec<u32>,

    /// Process names (`comm`) that are never invigilated.
    pub exempt_comms: Vec<String>,

    /// Capability number, as listed in `capabilities(7)`, whose presence in
    /// the effective set exempts a process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exempt_capability: Option<u8>,

    /// Time between two audits when watching a process. **Measured in
    /// seconds**.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub interval: Duration,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            padding: 0,
            exempt_uids: Vec::new(),
            exempt_comms: Vec::new(),
            exempt_capability: None,
            interval: Duration::from_secs(5),
        }
    }
}

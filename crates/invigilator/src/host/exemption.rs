#![forbid(unsafe_code)]

use super::ExemptionPolicy;
use crate::domain::ProcessIdentity;

/// Grants the exemption by effective capability, effective uid or process
/// name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemptionList {
    capability: Option<u8>,
    euids: Vec<u32>,
    comms: Vec<String>,
}

impl ExemptionList {
    pub fn new(config: &config::Config) -> Self {
        let mut euids = config.scan.exempt_uids.clone();
        euids.sort_unstable();
        euids.dedup();
        Self {
            capability: config.scan.exempt_capability,
            euids,
            comms: config.scan.exempt_comms.clone(),
        }
    }
}

impl ExemptionPolicy for ExemptionList {
    fn is_exempt(&self, process: &ProcessIdentity) -> bool {
        self.capability
            .is_some_and(|capability| process.has_capability(capability))
            || self.euids.binary_search(&process.euid).is_ok()
            || self.comms.iter().any(|comm| *comm == process.comm)
    }
}

/// Nobody is exempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExemption;

impl ExemptionPolicy for NoExemption {
    fn is_exempt(&self, _process: &ProcessIdentity) -> bool {
        false
    }
}

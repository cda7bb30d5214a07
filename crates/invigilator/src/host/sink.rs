#![forbid(unsafe_code)]

use super::ViolationSink;
use crate::report::Violation;
use tracing::warn;

/// Writes violation records to the `invigilator::violation` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ViolationSink for TracingSink {
    fn emit(&self, violation: &Violation) {
        warn!(
            target: "invigilator::violation",
            pid = violation.process.pid,
            word = violation.word_index,
            "{violation}"
        );
    }
}

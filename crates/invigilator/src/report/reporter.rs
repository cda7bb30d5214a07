#![forbid(unsafe_code)]

use super::{ContextByte, Violation};
use crate::domain::{AddressRange, MemoryRegion, ProcessIdentity};
use crate::host::{MemoryAccessor, RegionView, Scheduler, ViolationSink};
use tracing::trace;

/// How much context is dumped around a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSettings {
    pub before: usize,
    pub after: usize,
    /// Read context past the scanned span, through neighbouring regions.
    pub neighbor_context: bool,
}

impl ContextSettings {
    pub fn new(report: &config::Report) -> Self {
        Self {
            before: report.before,
            after: report.after,
            neighbor_context: report.neighbor_context,
        }
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self::new(&config::Report::default())
    }
}

/// A match the engine won the report for.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub word_index: usize,
    pub word: &'a str,
    pub address: u64,
    /// The run of address-adjacent scanned regions holding the match.
    pub span: AddressRange,
}

/// Turns matches into violation records and penalizes the offender.
pub struct Reporter {
    settings: ContextSettings,
    scheduler: Box<dyn Scheduler>,
    sink: Box<dyn ViolationSink>,
}

impl Reporter {
    pub fn new(
        settings: ContextSettings,
        scheduler: Box<dyn Scheduler>,
        sink: Box<dyn ViolationSink>,
    ) -> Self {
        Self {
            settings,
            scheduler,
            sink,
        }
    }

    /// Emit the violation and lower the process' scheduling priority by one
    /// nice step. Never fails.
    pub(crate) fn report(
        &self,
        process: &ProcessIdentity,
        memory: &dyn MemoryAccessor,
        view: &dyn RegionView,
        found: &Match<'_>,
    ) {
        let violation = self.describe(process, memory, view, found);
        self.sink.emit(&violation);

        // You weren't a nice task.
        self.scheduler.adjust_priority_hint(process, 1);
    }

    pub fn describe(
        &self,
        process: &ProcessIdentity,
        memory: &dyn MemoryAccessor,
        view: &dyn RegionView,
        found: &Match<'_>,
    ) -> Violation {
        let before = (self.settings.before > 0)
            .then(|| self.dump(memory, view, found.span, self.before_window(found)));
        let after = (self.settings.after > 0)
            .then(|| self.dump(memory, view, found.span, self.after_window(found)));

        Violation {
            word_index: found.word_index,
            word: found.word.to_owned(),
            process: process.clone(),
            address: found.address,
            before,
            after,
        }
    }

    fn before_window(&self, found: &Match<'_>) -> AddressRange {
        let mut start = found.address.saturating_sub(self.settings.before as u64);
        if !self.settings.neighbor_context {
            start = start.max(found.span.start);
        }
        AddressRange {
            start,
            end: found.address,
        }
    }

    fn after_window(&self, found: &Match<'_>) -> AddressRange {
        let start = found.address.saturating_add(found.word.len() as u64);
        let mut end = start.saturating_add(self.settings.after as u64);
        if !self.settings.neighbor_context {
            end = end.min(found.span.end);
        }
        AddressRange {
            start,
            end: end.max(start),
        }
    }

    /// Read `window` byte by byte. Bytes outside the scanned span must lie in
    /// some region of `view`; anything else, and any faulting read, becomes
    /// [`ContextByte::Unknown`].
    fn dump(
        &self,
        memory: &dyn MemoryAccessor,
        view: &dyn RegionView,
        span: AddressRange,
        window: AddressRange,
    ) -> Vec<ContextByte> {
        let mut bytes = Vec::with_capacity(window.len() as usize);
        let mut region: Option<MemoryRegion> = None;
        for addr in window.start..window.end {
            let in_span = span.start <= addr && addr < span.end;
            let valid = in_span || {
                if !region.is_some_and(|r| r.contains(addr)) {
                    region = view.region_containing(addr);
                }
                region.is_some()
            };
            let byte = if valid {
                memory.try_read_byte(addr)
            } else {
                None
            };
            bytes.push(byte.map_or(ContextByte::Unknown, ContextByte::Known));
        }
        trace!(
            start = window.start,
            end = window.end,
            "context dumped"
        );
        bytes
    }
}

#![forbid(unsafe_code)]

use crate::domain::{AddressRange, MemoryRegion, WordTable};
use crate::error::Error;
use crate::host::{
    ExemptionList, ExemptionPolicy, LockContext, RegionView, Renicer, Scheduler, TracingSink,
    ViolationSink,
};
use crate::report::{ContextSettings, Match, Reporter};
use crate::search::{SearchOutcome, find_in_span};
use crate::task::Task;
use config::Config;
use tracing::{debug, trace};

/// Host collaborators the engine reports through.
pub struct Services {
    pub exemption: Box<dyn ExemptionPolicy>,
    pub scheduler: Box<dyn Scheduler>,
    pub sink: Box<dyn ViolationSink>,
}

impl Services {
    /// Services for invigilating live processes: exemptions from the config,
    /// `setpriority` penalties, and violations written to the log.
    pub fn live(config: &Config) -> Self {
        Self {
            exemption: Box::new(ExemptionList::new(config)),
            scheduler: Box::new(Renicer),
            sink: Box::new(TracingSink),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Regions intersecting the scanned range.
    pub regions: usize,
    /// Words found, including words that had already been reported.
    pub matches: usize,
    /// Violations emitted by this call.
    pub reports: usize,
}

/// The scan engine.
pub struct Invigilator {
    exemption: Box<dyn ExemptionPolicy>,
    reporter: Reporter,
}

impl Invigilator {
    pub fn new(config: &Config, services: Services) -> Self {
        Self {
            exemption: services.exemption,
            reporter: Reporter::new(
                ContextSettings::new(&config.report),
                services.scheduler,
                services.sink,
            ),
        }
    }

    /// Scan `[addr, addr + size)` of `task`, waiting for the region map lock
    /// as long as it takes.
    pub fn invigilate(&self, task: &Task, addr: u64, size: u64) -> ScanSummary {
        match self.invigilate_with(task, addr, size, LockContext::Acquire { killable: false }) {
            Ok(summary) => summary,
            Err(err) => {
                debug!(pid = task.identity().pid, %err, "invigilation aborted");
                ScanSummary::default()
            }
        }
    }

    /// Like [`invigilate`](Self::invigilate), but gives up with
    /// [`Error::Interrupted`] if a fatal signal is pending while waiting for
    /// the lock. Nothing is reported or penalized in that case.
    pub fn invigilate_killable(
        &self,
        task: &Task,
        addr: u64,
        size: u64,
    ) -> Result<ScanSummary, Error> {
        self.invigilate_with(task, addr, size, LockContext::Acquire { killable: true })
    }

    /// Scan on behalf of a caller that already holds the region map lock,
    /// such as a fault handler. `view` is the caller's view of the map.
    pub fn invigilate_locked(
        &self,
        task: &Task,
        view: &dyn RegionView,
        addr: u64,
        size: u64,
    ) -> ScanSummary {
        match self.invigilate_with(task, addr, size, LockContext::Held(view)) {
            Ok(summary) => summary,
            Err(err) => {
                debug!(pid = task.identity().pid, %err, "invigilation aborted");
                ScanSummary::default()
            }
        }
    }

    /// Audit the whole address space of `task`.
    pub fn invigilate_wholemm(&self, task: &Task) -> ScanSummary {
        let whole = AddressRange::whole(task.mm().max_address());
        self.invigilate(task, whole.start, whole.len())
    }

    /// Killable variant of [`invigilate_wholemm`](Self::invigilate_wholemm).
    pub fn invigilate_wholemm_killable(&self, task: &Task) -> Result<ScanSummary, Error> {
        let whole = AddressRange::whole(task.mm().max_address());
        self.invigilate_killable(task, whole.start, whole.len())
    }

    pub fn invigilate_with(
        &self,
        task: &Task,
        addr: u64,
        size: u64,
        lock: LockContext<'_>,
    ) -> Result<ScanSummary, Error> {
        let scanner = task.scanner();
        let Some(words) = scanner.words().filter(|words| !words.is_empty()) else {
            return Ok(ScanSummary::default());
        };
        if self.exemption.is_exempt(task.identity()) {
            trace!(pid = task.identity().pid, "process is exempt");
            return Ok(ScanSummary::default());
        }

        let max_address = task.mm().max_address();
        let mut range = AddressRange::new(addr, size, max_address);
        if scanner.padding() > 0 {
            range = range.padded(scanner.padding(), max_address);
        }
        if range.is_empty() {
            return Ok(ScanSummary::default());
        }

        let summary = match lock {
            LockContext::Held(view) => self.scan_range(task, words, view, range),
            LockContext::Acquire { killable: false } => {
                let view = task.mm().lock_shared();
                self.scan_range(task, words, view.as_ref(), range)
            }
            LockContext::Acquire { killable: true } => {
                let view = task.mm().lock_shared_killable(task.fatal_signal())?;
                self.scan_range(task, words, view.as_ref(), range)
            }
        };

        debug!(
            pid = task.identity().pid,
            start = range.start,
            end = range.end,
            regions = summary.regions,
            matches = summary.matches,
            reports = summary.reports,
            "invigilation finished"
        );
        Ok(summary)
    }

    fn scan_range(
        &self,
        task: &Task,
        words: &WordTable,
        view: &dyn RegionView,
        range: AddressRange,
    ) -> ScanSummary {
        let mut summary = ScanSummary::default();
        let mut cursor = view.find_from(range.start);
        let mut previous: Option<MemoryRegion> = None;
        let mut run_start = range.start;

        while let Some(region) = cursor {
            let Some(base) = region.clip(&range) else {
                break;
            };
            summary.regions += 1;
            if !previous.is_some_and(|prev| prev.is_adjacent_to(&region)) {
                run_start = base.start;
            }
            let span = contiguous_span(view, region, base, range);
            // Context may reach back into adjacent regions scanned before.
            let run = AddressRange {
                start: run_start,
                end: span.end,
            };

            for (word_index, word) in words.iter() {
                let needle = word.as_bytes();
                // Enough to see every match starting in `base`; matches
                // starting further on belong to the next region.
                let limit = span.len().min(base.len() + needle.len() as u64 - 1);
                match find_in_span(task.memory(), base.start, limit, needle) {
                    SearchOutcome::Found(address) => {
                        summary.matches += 1;
                        if !task.scanner().claim_report(word_index) {
                            trace!(word_index, address, "word already reported");
                            continue;
                        }
                        let found = Match {
                            word_index,
                            word,
                            address,
                            span: run,
                        };
                        self.reporter
                            .report(task.identity(), task.memory(), view, &found);
                        summary.reports += 1;
                    }
                    SearchOutcome::Faulted(at) => {
                        trace!(word_index, at, "fault ended search of span");
                    }
                    SearchOutcome::Absent => {}
                }
            }

            previous = Some(region);
            cursor = view.next(&region);
        }
        summary
    }
}

/// Extend `base` through the regions directly following `region` without a
/// hole, stopping at the end of `range`.
fn contiguous_span(
    view: &dyn RegionView,
    region: MemoryRegion,
    base: AddressRange,
    range: AddressRange,
) -> AddressRange {
    let mut end = base.end;
    let mut tail = region;
    while end < range.end {
        match view.next(&tail) {
            Some(next) if tail.is_adjacent_to(&next) => {
                end = next.end.min(range.end);
                tail = next;
            }
            _ => break,
        }
    }
    AddressRange {
        start: base.start,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RegionTable;

    fn table(regions: &[(u64, u64)]) -> RegionTable {
        let mut table = RegionTable::default();
        for &(start, end) in regions {
            table.insert(MemoryRegion::new(start, end)).unwrap();
        }
        table
    }

    #[test]
    fn span_merges_adjacent_regions_only() {
        let table = table(&[(0x10, 0x20), (0x20, 0x30), (0x40, 0x50)]);
        let range = AddressRange {
            start: 0,
            end: 0x100,
        };
        let first = table.find_from(0).unwrap();
        let base = first.clip(&range).unwrap();
        let span = contiguous_span(&table, first, base, range);
        assert_eq!(
            span,
            AddressRange {
                start: 0x10,
                end: 0x30
            }
        );
    }

    #[test]
    fn span_stops_at_range_end() {
        let table = table(&[(0x10, 0x20), (0x20, 0x30)]);
        let range = AddressRange {
            start: 0x18,
            end: 0x24,
        };
        let first = table.find_from(range.start).unwrap();
        let base = first.clip(&range).unwrap();
        let span = contiguous_span(&table, first, base, range);
        assert_eq!(
            span,
            AddressRange {
                start: 0x18,
                end: 0x24
            }
        );
    }
}

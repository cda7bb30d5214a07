#![forbid(unsafe_code)]

mod report_bitmap;

pub use report_bitmap::ReportBitmap;

use crate::domain::WordTable;
use std::sync::Arc;

/// Per-process invigilation state.
///
/// The word table is shared with every other process, the padding is the
/// process' own copy, and the report bitmap remembers which words this
/// process instance has already been reported for.
#[derive(Debug, Default)]
pub struct ScannerState {
    words: Option<Arc<WordTable>>,
    padding: u64,
    reported: ReportBitmap,
}

impl ScannerState {
    pub fn new(words: Option<Arc<WordTable>>, padding: u64) -> Self {
        let reported = ReportBitmap::new(words.as_deref().map_or(0, WordTable::len));
        Self {
            words,
            padding,
            reported,
        }
    }

    /// State of the first process: no words, no padding, nothing reported.
    pub fn root() -> Self {
        Self::default()
    }

    /// State for a process duplicated from the owner of `self`.
    ///
    /// The word table is shared and the padding copied. Reports are never
    /// inherited, so the child starts with a clear bitmap.
    pub fn derive_child(&self) -> Self {
        Self::new(self.words.clone(), self.padding)
    }

    pub fn words(&self) -> Option<&WordTable> {
        self.words.as_deref()
    }

    pub fn shared_words(&self) -> Option<&Arc<WordTable>> {
        self.words.as_ref()
    }

    pub fn words_count(&self) -> usize {
        self.words.as_deref().map_or(0, WordTable::len)
    }

    pub fn padding(&self) -> u64 {
        self.padding
    }

    pub fn is_reported(&self, word: usize) -> bool {
        self.reported.is_set(word)
    }

    pub fn reported_count(&self) -> usize {
        self.reported.count()
    }

    /// Claim the right to report `word`. Exactly one caller ever gets `true`.
    pub(crate) fn claim_report(&self, word: usize) -> bool {
        self.reported.test_and_set(word)
    }
}

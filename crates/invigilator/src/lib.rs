#![deny(unsafe_code)]

//! Invigilation of process memory for banned words.
//!
//! A [`Task`] is scanned by the [`Invigilator`]: the requested range is
//! walked region by region under the region map's shared lock, every
//! configured word is searched for, and the first match of each word in a
//! process is reported once and penalized with one nice step.

pub mod domain;
pub mod engine;
pub mod error;
pub mod host;
pub mod report;
pub mod search;
pub mod state;
pub mod task;

pub use domain::{AddressRange, MemoryRegion, ProcessIdentity, WordTable};
pub use engine::{Invigilator, ScanSummary, Services};
pub use error::Error;
pub use host::{
    AddressSpace, ExemptionPolicy, FatalSignal, LockContext, MemoryAccessor, RegionView,
    Scheduler, ViolationSink,
};
pub use report::{ContextByte, ContextSettings, Violation};
pub use search::{SearchOutcome, find_in_span};
pub use state::{ReportBitmap, ScannerState};
pub use task::Task;

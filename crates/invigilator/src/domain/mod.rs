#![forbid(unsafe_code)]

mod identity;
mod region;
mod word_table;

pub use identity::ProcessIdentity;
pub use region::{AddressRange, MemoryRegion};
pub use word_table::WordTable;

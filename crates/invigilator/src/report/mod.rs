#![forbid(unsafe_code)]

mod reporter;
mod violation;

pub use reporter::{ContextSettings, Match, Reporter};
pub use violation::{ContextByte, Violation};

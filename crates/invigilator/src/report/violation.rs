#![forbid(unsafe_code)]

use crate::domain::ProcessIdentity;
use std::fmt;

/// One byte of match context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextByte {
    Known(u8),
    /// Outside every valid region, or the read faulted.
    Unknown,
}

impl fmt::Display for ContextByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextByte::Known(byte) => write!(f, "{byte:02x}"),
            ContextByte::Unknown => f.write_str("xx"),
        }
    }
}

/// A banned word found in a process' memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub word_index: usize,
    pub word: String,
    pub process: ProcessIdentity,
    /// Address of the first byte of the match.
    pub address: u64,
    /// Bytes preceding the match, `None` when that side is disabled.
    pub before: Option<Vec<ContextByte>>,
    /// Bytes following the match, `None` when that side is disabled.
    pub after: Option<Vec<ContextByte>>,
}

fn write_context(f: &mut fmt::Formatter<'_>, label: &str, bytes: &[ContextByte]) -> fmt::Result {
    write!(f, " {label} [")?;
    for byte in bytes {
        write!(f, " {byte}")?;
    }
    f.write_str(" ]")
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invigilation violation: {} WORD `{}'", self.process, self.word)?;
        if let Some(before) = &self.before {
            write_context(f, "before", before)?;
        }
        if let Some(after) = &self.after {
            write_context(f, "after", after)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_line_format() {
        let violation = Violation {
            word_index: 1,
            word: "panic".into(),
            process: ProcessIdentity::new("victim", 42)
                .with_uids(1000, 1001)
                .with_gids(100, 101),
            address: 0x1001,
            before: Some(vec![ContextByte::Unknown, ContextByte::Known(b'x')]),
            after: Some(vec![ContextByte::Known(0x0a)]),
        };
        assert_eq!(
            violation.to_string(),
            "invigilation violation: COMM `victim' PID 42 UID 1000 EUID 1001 GID 100 EGID 101 \
             WORD `panic' before [ xx 78 ] after [ 0a ]"
        );
    }

    #[test]
    fn disabled_sides_are_omitted() {
        let violation = Violation {
            word_index: 0,
            word: "kernel".into(),
            process: ProcessIdentity::new("init", 1),
            address: 0,
            before: None,
            after: Some(Vec::new()),
        };
        assert_eq!(
            violation.to_string(),
            "invigilation violation: COMM `init' PID 1 UID 0 EUID 0 GID 0 EGID 0 \
             WORD `kernel' after [ ]"
        );
    }
}

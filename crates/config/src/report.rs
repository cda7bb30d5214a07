use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Report {
    /// Number of bytes preceding a match that are dumped in the violation
    /// record. Zero disables the `before` section.
    pub before: usize,

    /// Number of bytes following a match that are dumped in the violation
    /// record. Zero disables the `after` section.
    pub after: usize,

    /// Whether context bytes may be read from regions outside the span that
    /// was scanned. When off, the context is cut at the span boundaries.
    pub neighbor_context: bool,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            before: 16,
            after: 16,
            neighbor_context: false,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Default capacity of the word table and of every per-process report
/// bitmap.
pub const DEFAULT_MAX_WORDS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Words {
    /// Banned words, separated by commas. Empty items (two commas in a row)
    /// are skipped and the last item does not need a trailing comma.
    ///
    /// ## Note
    ///
    /// The list is read once at startup. Changing it and reloading the
    /// configuration has no effect on a running invigilator.
    pub list: String,

    /// Maximum number of words taken from `list`. Words past this limit are
    /// dropped with a warning.
    pub max_words: usize,
}

impl Default for Words {
    fn default() -> Self {
        Self {
            list: String::new(),
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

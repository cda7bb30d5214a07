#![forbid(unsafe_code)]

use crate::error::Error;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

static INSTALLED: OnceLock<Arc<WordTable>> = OnceLock::new();

/// The banned words, in configuration order.
///
/// A table is built once from the configured list and never changes after
/// that. Processes hold it through an [`Arc`] so every process shares the
/// same copy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordTable {
    words: Vec<Box<str>>,
    capacity: usize,
}

impl WordTable {
    /// Split a comma separated list into words.
    ///
    /// Empty items are skipped. Once `max_words` words were taken, the rest
    /// of the list is dropped with a warning.
    pub fn parse(list: &str, max_words: usize) -> Self {
        let mut words = Vec::new();
        for token in list.split(',').filter(|token| !token.is_empty()) {
            if words.len() == max_words {
                warn!(max_words, "too many banned words, ignoring the rest");
                break;
            }
            words.push(Box::from(token));
        }
        debug!(count = words.len(), "word table built");
        Self {
            words,
            capacity: max_words,
        }
    }

    pub fn from_config(words: &config::Words) -> Self {
        Self::parse(&words.list, words.max_words)
    }

    /// Publish this table as the process-wide word table.
    ///
    /// Only the first call succeeds; the installed table can never be
    /// replaced afterwards.
    pub fn install(self) -> Result<Arc<WordTable>, Error> {
        let table = Arc::new(self);
        INSTALLED
            .set(Arc::clone(&table))
            .map_err(|_| Error::WordsAlreadyInstalled)?;
        Ok(table)
    }

    /// The process-wide word table, if one was installed.
    pub fn installed() -> Option<Arc<WordTable>> {
        INSTALLED.get().cloned()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Maximum number of words this table was allowed to hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(AsRef::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.words.iter().map(AsRef::as_ref).enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(table: &WordTable) -> Vec<&str> {
        table.iter().map(|(_, word)| word).collect()
    }

    #[test]
    fn empty_items_are_skipped() {
        let table = WordTable::parse(",,kernel,,panic,", 8);
        assert_eq!(words(&table), ["kernel", "panic"]);
    }

    #[test]
    fn trailing_word_without_comma_is_kept() {
        let table = WordTable::parse("kernel,panic", 8);
        assert_eq!(words(&table), ["kernel", "panic"]);
    }

    #[test]
    fn overflow_is_truncated() {
        let table = WordTable::parse("a,b,c,d", 2);
        assert_eq!(words(&table), ["a", "b"]);
        assert_eq!(table.capacity(), 2);
    }

    #[test]
    fn empty_list_gives_empty_table() {
        assert!(WordTable::parse("", 8).is_empty());
        assert!(WordTable::parse(",,,", 8).is_empty());
    }

    #[test]
    fn install_is_write_once() {
        let first = WordTable::parse("kernel", 4).install().unwrap();
        assert_eq!(WordTable::installed().as_deref(), Some(&*first));

        let second = WordTable::parse("panic", 4).install();
        assert!(matches!(second, Err(Error::WordsAlreadyInstalled)));
        assert_eq!(WordTable::installed().unwrap().get(0), Some("kernel"));
    }

    proptest! {
        #[test]
        fn parse_matches_split_reference(
            tokens in prop::collection::vec("[a-z]{0,4}", 0..20),
            max_words in 1usize..10,
        ) {
            let list = tokens.join(",");
            let table = WordTable::parse(&list, max_words);
            let expected: Vec<&str> = list
                .split(',')
                .filter(|t| !t.is_empty())
                .take(max_words)
                .collect();
            prop_assert_eq!(words(&table), expected);
        }
    }
}

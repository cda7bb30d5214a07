#![forbid(unsafe_code)]

//! Fault tolerant substring search over user memory.

use crate::host::MemoryAccessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// First occurrence starts at this address.
    Found(u64),
    /// Every window was compared and none matched.
    Absent,
    /// A read faulted at this address. The rest of the span was not searched.
    Faulted(u64),
}

impl SearchOutcome {
    /// The match address; a fault counts as no match.
    pub fn found(self) -> Option<u64> {
        match self {
            SearchOutcome::Found(addr) => Some(addr),
            SearchOutcome::Absent | SearchOutcome::Faulted(_) => None,
        }
    }
}

/// Find the first occurrence of `needle` in `[start, start + size)`.
///
/// Windows are tried in increasing address order and each comparison stops at
/// the first mismatching byte. A faulting read ends the whole search: the
/// remainder of the span is treated as not containing the needle.
pub fn find_in_span(
    memory: &dyn MemoryAccessor,
    start: u64,
    size: u64,
    needle: &[u8],
) -> SearchOutcome {
    let len = needle.len() as u64;
    if len == 0 || size < len {
        return SearchOutcome::Absent;
    }

    'window: for offset in 0..=size - len {
        let window = start + offset;
        for (idx, &expected) in needle.iter().enumerate() {
            let addr = window + idx as u64;
            match memory.try_read_byte(addr) {
                None => return SearchOutcome::Faulted(addr),
                Some(byte) if byte != expected => continue 'window,
                Some(_) => {}
            }
        }
        return SearchOutcome::Found(window);
    }
    SearchOutcome::Absent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SparseMemory;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_with(addr: u64, bytes: &[u8]) -> SparseMemory {
        let memory = SparseMemory::new();
        memory.write(addr, bytes);
        memory
    }

    /// Counts reads so tests can observe early exits.
    struct CountingMemory<'a> {
        inner: &'a SparseMemory,
        reads: AtomicUsize,
    }

    impl MemoryAccessor for CountingMemory<'_> {
        fn try_read_byte(&self, addr: u64) -> Option<u8> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.try_read_byte(addr)
        }
    }

    #[test]
    fn finds_first_occurrence() {
        let memory = memory_with(0x100, b"xxpanicxxpanic");
        assert_eq!(
            find_in_span(&memory, 0x100, 14, b"panic"),
            SearchOutcome::Found(0x102)
        );
    }

    #[test]
    fn match_must_fit_in_span() {
        let memory = memory_with(0x100, b"xxpanic");
        assert_eq!(find_in_span(&memory, 0x100, 6, b"panic"), SearchOutcome::Absent);
        assert_eq!(
            find_in_span(&memory, 0x100, 7, b"panic"),
            SearchOutcome::Found(0x102)
        );
    }

    #[test]
    fn span_shorter_than_needle_reads_nothing() {
        let inner = memory_with(0, b"pan");
        let memory = CountingMemory {
            inner: &inner,
            reads: AtomicUsize::new(0),
        };
        assert_eq!(find_in_span(&memory, 0, 3, b"panic"), SearchOutcome::Absent);
        assert_eq!(memory.reads.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn mismatch_stops_window_early() {
        let inner = memory_with(0, b"zzzz");
        let memory = CountingMemory {
            inner: &inner,
            reads: AtomicUsize::new(0),
        };
        assert_eq!(find_in_span(&memory, 0, 4, b"ab"), SearchOutcome::Absent);
        // One read per window: three windows, each rejected on its first byte.
        assert_eq!(memory.reads.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn fault_aborts_remaining_search() {
        // The word sits after the faulting byte but is never reached.
        let memory = memory_with(0, b"pa?xxpanic");
        memory.poison(2);
        assert_eq!(
            find_in_span(&memory, 0, 10, b"panic"),
            SearchOutcome::Faulted(2)
        );
        assert_eq!(find_in_span(&memory, 0, 10, b"panic").found(), None);
    }

    #[test]
    fn fault_after_last_window_is_never_read() {
        let memory = memory_with(0, b"panic");
        assert_eq!(find_in_span(&memory, 0, 5, b"panic"), SearchOutcome::Found(0));
    }

    proptest! {
        #[test]
        fn agrees_with_slice_search(
            haystack in prop::collection::vec(b'a'..=b'c', 0..64),
            needle in prop::collection::vec(b'a'..=b'c', 1..4),
            base in 0u64..1_000_000,
        ) {
            let memory = memory_with(base, &haystack);
            let expected = haystack
                .windows(needle.len())
                .position(|w| w == needle.as_slice())
                .map(|pos| base + pos as u64);
            let got = find_in_span(&memory, base, haystack.len() as u64, &needle);
            prop_assert_eq!(got.found(), expected);
            prop_assert!(!matches!(got, SearchOutcome::Faulted(_)));
        }
    }
}

#![forbid(unsafe_code)]

//! Lock-free per-word report flags.
//!
//! Bits only ever go from 0 to 1. All operations use `Relaxed` ordering:
//! `fetch_or` alone guarantees a single caller observes the 0 -> 1 edge of a
//! bit, and nothing else is published through the bitmap.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const BITS: usize = u64::BITS as usize;

pub struct ReportBitmap {
    words: Box<[AtomicU64]>,
    bit_length: usize,
}

impl ReportBitmap {
    /// A bitmap of `bit_length` cleared bits.
    pub fn new(bit_length: usize) -> Self {
        let words = (0..bit_length.div_ceil(BITS))
            .map(|_| AtomicU64::new(0))
            .collect();
        Self { words, bit_length }
    }

    /// Set bit `idx` and return `true` if this call is the one that set it.
    ///
    /// Out of range indices are never claimed.
    #[inline]
    pub fn test_and_set(&self, idx: usize) -> bool {
        if idx >= self.bit_length {
            return false;
        }
        let mask = 1u64 << (idx % BITS);
        let prev = self.words[idx / BITS].fetch_or(mask, Ordering::Relaxed);
        prev & mask == 0
    }

    #[inline]
    pub fn is_set(&self, idx: usize) -> bool {
        if idx >= self.bit_length {
            return false;
        }
        let mask = 1u64 << (idx % BITS);
        self.words[idx / BITS].load(Ordering::Relaxed) & mask != 0
    }

    /// Number of set bits. A snapshot under concurrent updates.
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.bit_length
    }

    pub fn is_empty(&self) -> bool {
        self.bit_length == 0
    }
}

impl Default for ReportBitmap {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for ReportBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportBitmap")
            .field("bit_length", &self.bit_length)
            .field("set", &self.count())
            .finish()
    }
}

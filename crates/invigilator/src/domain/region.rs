#![forbid(unsafe_code)]

/// A mapped span `[start, end)` of a process address space, as handed out by
/// the host region map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
}

impl MemoryRegion {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub const fn contains(&self, addr: u64) -> bool {
        self.start <= addr && addr < self.end
    }

    /// True when `next` begins exactly where this region ends, so that the
    /// two form one contiguous span with no hole in between.
    pub const fn is_adjacent_to(&self, next: &MemoryRegion) -> bool {
        self.end == next.start
    }

    pub const fn overlaps(&self, other: &MemoryRegion) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The part of this region that lies inside `range`, if any.
    pub fn clip(&self, range: &AddressRange) -> Option<AddressRange> {
        let start = self.start.max(range.start);
        let end = self.end.min(range.end);
        (start < end).then_some(AddressRange { start, end })
    }
}

/// A requested span `[start, end)` of the caller's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    /// Build the range `[addr, addr + size)`, clamped to `[0, max_address)`.
    pub fn new(addr: u64, size: u64, max_address: u64) -> Self {
        let start = addr.min(max_address);
        let end = addr.saturating_add(size).min(max_address);
        Self { start, end }
    }

    pub const fn whole(max_address: u64) -> Self {
        Self {
            start: 0,
            end: max_address,
        }
    }

    /// Extend the range by `padding` bytes on each side, clamped to
    /// `[0, max_address)`.
    pub fn padded(self, padding: u64, max_address: u64) -> Self {
        Self {
            start: self.start.saturating_sub(padding),
            end: self.end.saturating_add(padding).min(max_address),
        }
    }

    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn adjacency_requires_touching_edges() {
        let a = MemoryRegion::new(0x1000, 0x2000);
        assert!(a.is_adjacent_to(&MemoryRegion::new(0x2000, 0x3000)));
        assert!(!a.is_adjacent_to(&MemoryRegion::new(0x2001, 0x3000)));
    }

    #[test]
    fn padding_is_clamped_to_address_bounds() {
        let range = AddressRange::new(4, 8, 16).padded(10, 16);
        assert_eq!(range, AddressRange { start: 0, end: 16 });
    }

    #[test]
    fn range_past_max_address_is_empty() {
        let range = AddressRange::new(32, 8, 16);
        assert!(range.is_empty());
    }

    proptest! {
        #[test]
        fn clip_stays_inside_both(
            rs in 0u64..1000, rl in 0u64..1000,
            qs in 0u64..1000, ql in 0u64..1000,
        ) {
            let region = MemoryRegion::new(rs, rs + rl);
            let range = AddressRange { start: qs, end: qs + ql };
            match region.clip(&range) {
                Some(clip) => {
                    prop_assert!(clip.start < clip.end);
                    prop_assert!(region.start <= clip.start && clip.end <= region.end);
                    prop_assert!(range.start <= clip.start && clip.end <= range.end);
                }
                None => prop_assert!(
                    rl == 0 || ql == 0 || rs + rl <= qs || qs + ql <= rs
                ),
            }
        }
    }
}

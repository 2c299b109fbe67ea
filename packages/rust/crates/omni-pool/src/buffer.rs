//! Windowed buffer: the retained elements plus the offset of the oldest one.

use std::collections::VecDeque;
use std::mem;

/// Growable window over an append-only sequence. O(1) amortized append, head trimming
/// advances `base_offset`.
///
/// `elements[i]` is global offset `base_offset + i`. Offsets below `base_offset` have
/// been evicted and are never served again.
#[derive(Debug, Clone)]
pub struct WindowedBuffer<T> {
    elements: VecDeque<T>,
    base_offset: u64,
}

impl<T> Default for WindowedBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WindowedBuffer<T> {
    /// Create an empty window starting at offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: VecDeque::new(),
            base_offset: 0,
        }
    }

    /// Create a window seeded with `elements` at offsets `0..len`.
    #[must_use]
    pub fn with_elements(elements: impl IntoIterator<Item = T>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            base_offset: 0,
        }
    }

    /// Append elements at the tail.
    pub fn append(&mut self, items: impl IntoIterator<Item = T>) {
        self.elements.extend(items);
    }

    /// Append one element at the tail.
    pub fn push(&mut self, item: T) {
        self.elements.push_back(item);
    }

    /// Number of retained elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Offset of the oldest retained element.
    #[must_use]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Offset the next appended element will get.
    #[must_use]
    pub fn tail_offset(&self) -> u64 {
        self.base_offset + as_u64(self.elements.len())
    }

    /// Estimated in-memory footprint of the retained elements, in bytes.
    #[must_use]
    pub fn footprint(&self) -> u64 {
        as_u64(self.elements.len()).saturating_mul(as_u64(mem::size_of::<T>()))
    }

    /// Number of elements at or after `offset`.
    ///
    /// Zero both when `offset` was evicted and when it has not been produced yet.
    #[must_use]
    pub fn length_from(&self, offset: u64) -> usize {
        self.index_of(offset)
            .map_or(0, |index| self.elements.len() - index)
    }

    /// Iterate retained elements, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    /// Drop elements from the head until at most `count` remain. Returns the number evicted.
    pub fn trim_to_count(&mut self, count: usize) -> usize {
        if count >= self.elements.len() {
            return 0;
        }
        let cut = self.elements.len() - count;
        self.elements.drain(..cut);
        self.base_offset += as_u64(cut);
        cut
    }

    /// Drop elements from the head until the footprint fits in `max_bytes`.
    ///
    /// Uses a uniform per-element estimate (footprint / count), so trimming is
    /// count-granular. Returns the number evicted.
    pub fn trim_to_size(&mut self, max_bytes: u64) -> usize {
        let footprint = self.footprint();
        if self.elements.is_empty() || footprint <= max_bytes {
            return 0;
        }
        let per_element = footprint / as_u64(self.elements.len());
        if per_element == 0 {
            return 0;
        }
        let keep = usize::try_from(max_bytes / per_element).unwrap_or(usize::MAX);
        self.trim_to_count(keep)
    }

    fn index_of(&self, offset: u64) -> Option<usize> {
        let index = usize::try_from(offset.checked_sub(self.base_offset)?).ok()?;
        (index < self.elements.len()).then_some(index)
    }
}

impl<T: Clone> WindowedBuffer<T> {
    /// Copy of the elements from `offset` to the tail.
    ///
    /// An offset outside the window clamps to the start of the window.
    #[must_use]
    pub fn slice_from(&self, offset: u64) -> Vec<T> {
        let start = self.index_of(offset).unwrap_or(0);
        self.elements.range(start..).cloned().collect()
    }
}

fn as_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

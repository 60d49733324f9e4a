use std::iter::FusedIterator;

use crate::{array_subset::ArraySubset, ArrayIndices};

/// Iterates over the element (or block) indices of an [`ArraySubset`] in C order, the last dimension varying fastest.
///
/// The indices of a `2x2` subset starting at `[1, 1]` are produced as `[1, 1]`, `[1, 2]`, `[2, 1]`, `[2, 2]`.
/// A zero-dimensional subset yields a single empty index.
#[derive(Debug, Clone)]
pub struct IndicesIterator {
    subset: ArraySubset,
    index: u64,
    length: u64,
}

impl IndicesIterator {
    /// Iterate over the indices of `subset`.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        let length = subset.num_elements();
        Self {
            subset,
            index: 0,
            length,
        }
    }
}

impl Iterator for IndicesIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.length {
            return None;
        }
        let mut remainder = self.index;
        let mut indices: ArrayIndices = std::iter::zip(self.subset.start(), self.subset.shape())
            .rev()
            .map(|(&start, &size)| {
                let index = start + remainder % size;
                remainder /= size;
                index
            })
            .collect();
        indices.reverse();
        self.index += 1;
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.length - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIterator {}

impl FusedIterator for IndicesIterator {}

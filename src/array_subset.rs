//! Array subsets.
//!
//! An [`ArraySubset`] is a hyperrectangular region of an array, defined by a start and a shape.
//! It is used throughout this library to describe the region covered by a block, the bounding region of a selection, and the overlap between them.

mod indices_iterator;

pub use indices_iterator::IndicesIterator;

use std::ops::Range;

use derive_more::Display;
use itertools::izip;
use thiserror::Error;

use crate::{ArrayIndices, ArrayShape};

/// A hyperrectangle of element indices: `start` up to (excluding) `start + shape` in each dimension.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    start: ArrayIndices,
    shape: ArrayShape,
}

impl ArraySubset {
    /// The subset covering a whole array of `shape`.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// A subset spanning one [`Range`] per dimension. Reversed ranges are empty.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self { start, shape }
    }

    /// A subset of `shape` elements offset by `start`.
    ///
    /// # Errors
    /// Fails if `start` and `shape` differ in length.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(
                start.len(),
                shape.len(),
            ))
        }
    }

    /// A subset from `start` to the exclusive bound `end`, clamped to zero extent where `end` precedes `start`.
    ///
    /// # Errors
    /// Fails if `start` and `end` differ in length.
    pub fn new_with_start_end_exc(
        start: ArrayIndices,
        end: ArrayIndices,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() != end.len() {
            return Err(IncompatibleDimensionalityError::new(end.len(), start.len()));
        }
        let shape = std::iter::zip(&start, end)
            .map(|(start, end)| end.saturating_sub(*start))
            .collect();
        Ok(Self { start, shape })
    }

    /// Lowest index in each dimension.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Extent in each dimension.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// One past the highest index in each dimension.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// One `start..end` range per dimension.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&start, &size)| start..start + size)
            .collect()
    }

    /// Product of the extents. A zero-dimensional subset holds one element.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Whether any extent is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// Whether the subset fits inside an array of `array_shape` with the same dimensionality.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && izip!(&self.start, &self.shape, array_shape)
                .all(|(start, size, bound)| start + size <= *bound)
    }

    /// The intersection with `other`. Disjoint subsets intersect in an empty subset.
    ///
    /// # Errors
    /// Fails if `other` has a different dimensionality.
    pub fn overlap(&self, other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let ranges: Vec<Range<u64>> = std::iter::zip(self.to_ranges(), other.to_ranges())
            .map(|(a, b)| a.start.max(b.start)..a.end.min(b.end))
            .collect();
        Ok(Self::new_with_ranges(&ranges))
    }

    /// The same subset with `start` as its origin.
    ///
    /// # Errors
    /// Fails on a dimensionality mismatch, or with [`ArraySubsetError::Underflow`] if `start` lies past this subset's start.
    pub fn relative_to(&self, start: &[u64]) -> Result<Self, ArraySubsetError> {
        if start.len() != self.dimensionality() {
            return Err(
                IncompatibleDimensionalityError::new(start.len(), self.dimensionality()).into(),
            );
        }
        let relative_start = std::iter::zip(&self.start, start)
            .map(|(a, b)| a.checked_sub(*b))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ArraySubsetError::Underflow(self.clone(), start.to_vec()))?;
        Ok(Self {
            start: relative_start,
            shape: self.shape.clone(),
        })
    }

    /// Every index in the subset, last dimension fastest.
    #[must_use]
    pub fn iter_indices(&self) -> IndicesIterator {
        IndicesIterator::new(self.clone())
    }
}

/// Two indices, shapes or subsets that should agree in dimensionality do not.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("got {0} dimensions where {1} were expected")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// `got` dimensions were supplied where `expected` were required.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// Errors from [`ArraySubset`] arithmetic.
#[derive(Clone, Debug, Error)]
pub enum ArraySubsetError {
    /// See [`IncompatibleDimensionalityError`].
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// The subset starts before the requested origin.
    #[error("array subset {_0} starts before {_1:?}")]
    Underflow(ArraySubset, ArrayIndices),
}

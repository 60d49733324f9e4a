//! Selections (slices) over arrays.
//!
//! A [`Selection`] is an ordered list of per-axis [`Slice`]s with the indexing semantics of a conventional labeled-array library:
//!  - a [`Slice::Index`] picks a single position and drops the axis,
//!  - a [`Slice::Range`] keeps the axis and picks `start..stop` every `step` elements,
//!  - negative positions count from the end of the axis, range bounds are clamped, and a negative `step` walks backwards,
//!  - axes without an entry select everything.
//!
//! A selection is resolved against a concrete shape with [`Selection::normalise`], producing a [`NormalisedSelection`] which knows the result shape and the bounding [`ArraySubset`] that must be fetched.
//!
//! Selections have a compact text form used in block request query strings:
//! ```rust
//! # use tiled_array_client::selection::{Selection, Slice};
//! let selection: Selection = "1:3,5,::-1".parse()?;
//! assert_eq!(selection[1], Slice::Index(5));
//! assert_eq!(selection.to_string(), "1:3,5,::-1");
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

use std::{
    fmt::Display,
    ops::{Range, RangeFrom, RangeFull, RangeTo},
    str::FromStr,
};

use derive_more::{Deref, From};
use itertools::Itertools;
use thiserror::Error;

use crate::{array_subset::ArraySubset, ArrayIndices, ArrayShape};

/// A selection along a single axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slice {
    /// A single position. The axis is removed from the result.
    Index(i64),
    /// A range of positions with an optional step.
    Range {
        /// The first position (inclusive). Defaults to the start of the axis (or the end for a negative step).
        start: Option<i64>,
        /// The last position (exclusive). Defaults to the end of the axis (or the start for a negative step).
        stop: Option<i64>,
        /// The step. Defaults to `1`.
        step: Option<i64>,
    },
}

impl Slice {
    /// Select everything along an axis.
    #[must_use]
    pub const fn full() -> Self {
        Self::Range {
            start: None,
            stop: None,
            step: None,
        }
    }

    /// Create a range slice with explicit bounds and step.
    #[must_use]
    pub const fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self::Range { start, stop, step }
    }

    /// Returns true if this slice selects everything along an axis.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(
            self,
            Self::Range {
                start: None,
                stop: None,
                step: None | Some(1),
            }
        )
    }
}

impl Default for Slice {
    fn default() -> Self {
        Self::full()
    }
}

impl From<i64> for Slice {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<Range<i64>> for Slice {
    fn from(range: Range<i64>) -> Self {
        Self::new(Some(range.start), Some(range.end), None)
    }
}

impl From<RangeFrom<i64>> for Slice {
    fn from(range: RangeFrom<i64>) -> Self {
        Self::new(Some(range.start), None, None)
    }
}

impl From<RangeTo<i64>> for Slice {
    fn from(range: RangeTo<i64>) -> Self {
        Self::new(None, Some(range.end), None)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

impl Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn bound(value: Option<i64>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Range { start, stop, step } => {
                write!(f, "{}:{}", bound(*start), bound(*stop))?;
                if let Some(step) = step {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Slice {
    type Err = ParseSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn bound(part: &str, s: &str) -> Result<Option<i64>, ParseSelectionError> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse()
                    .map(Some)
                    .map_err(|_| ParseSelectionError(s.to_string()))
            }
        }
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [index] => bound(index, s)?
                .map(Slice::Index)
                .ok_or_else(|| ParseSelectionError(s.to_string())),
            [start, stop] => Ok(Slice::new(bound(start, s)?, bound(stop, s)?, None)),
            [start, stop, step] => Ok(Slice::new(
                bound(start, s)?,
                bound(stop, s)?,
                bound(step, s)?,
            )),
            _ => Err(ParseSelectionError(s.to_string())),
        }
    }
}

/// An ordered list of per-axis slices.
///
/// Conversions follow the normalisation rule of the readers: `()` is an empty selection (select everything), a single slice-like value is a one-element selection, and a sequence of slices is taken as given.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deref, From)]
pub struct Selection(Vec<Slice>);

impl Selection {
    /// Create a new selection from per-axis slices.
    #[must_use]
    pub fn new(slices: Vec<Slice>) -> Self {
        Self(slices)
    }

    /// A selection of everything.
    #[must_use]
    pub fn all() -> Self {
        Self(Vec::new())
    }

    /// Return the slice for `axis`, defaulting to [`Slice::full`] beyond the end of the selection.
    #[must_use]
    pub fn axis(&self, axis: usize) -> Slice {
        self.0.get(axis).copied().unwrap_or_default()
    }

    /// Resolve this selection against `shape`.
    ///
    /// # Errors
    /// Returns an [`InvalidSelectionError`] if
    ///  - there are more slices than dimensions,
    ///  - an index is out of range, or
    ///  - a step is zero.
    pub fn normalise(&self, shape: &[u64]) -> Result<NormalisedSelection, InvalidSelectionError> {
        if self.0.len() > shape.len() {
            return Err(InvalidSelectionError::TooManyIndices {
                got: self.0.len(),
                rank: shape.len(),
            });
        }
        let axes = shape
            .iter()
            .enumerate()
            .map(|(axis, &size)| AxisSelection::new(axis, &self.axis(axis), size))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NormalisedSelection { axes })
    }
}

impl From<()> for Selection {
    fn from((): ()) -> Self {
        Self::all()
    }
}

impl From<&[Slice]> for Selection {
    fn from(slices: &[Slice]) -> Self {
        Self(slices.to_vec())
    }
}

impl<const N: usize> From<[Slice; N]> for Selection {
    fn from(slices: [Slice; N]) -> Self {
        Self(slices.to_vec())
    }
}

impl From<&Selection> for Selection {
    fn from(selection: &Selection) -> Self {
        selection.clone()
    }
}

macro_rules! selection_from_single {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Selection {
                fn from(value: $t) -> Self {
                    Self(vec![Slice::from(value)])
                }
            }
        )*
    };
}

selection_from_single!(Slice, i64, Range<i64>, RangeFrom<i64>, RangeTo<i64>, RangeFull);

impl Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

impl FromStr for Selection {
    type Err = ParseSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::all());
        }
        s.split(',')
            .map(Slice::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// A slice resolved against an axis of known size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisSelection {
    first: u64,
    count: u64,
    step: i64,
    dropped: bool,
}

impl AxisSelection {
    fn new(axis: usize, slice: &Slice, size: u64) -> Result<Self, InvalidSelectionError> {
        let n = i64::try_from(size).unwrap_or(i64::MAX);
        match *slice {
            Slice::Index(index) => {
                let resolved = if index < 0 { index + n } else { index };
                if (0..n).contains(&resolved) {
                    Ok(Self {
                        first: resolved.unsigned_abs(),
                        count: 1,
                        step: 1,
                        dropped: true,
                    })
                } else {
                    Err(InvalidSelectionError::IndexOutOfRange { axis, index, size })
                }
            }
            Slice::Range { start, stop, step } => {
                let step = step.unwrap_or(1);
                let resolve = |value: i64, lower: i64, upper: i64| {
                    let value = if value < 0 { value + n } else { value };
                    value.clamp(lower, upper)
                };
                let (first, count) = match step.cmp(&0) {
                    std::cmp::Ordering::Equal => {
                        return Err(InvalidSelectionError::ZeroStep { axis })
                    }
                    std::cmp::Ordering::Greater => {
                        let start = start.map_or(0, |v| resolve(v, 0, n));
                        let stop = stop.map_or(n, |v| resolve(v, 0, n));
                        let count = if stop > start {
                            (stop - start - 1).unsigned_abs() / step.unsigned_abs() + 1
                        } else {
                            0
                        };
                        (start, count)
                    }
                    std::cmp::Ordering::Less => {
                        let start = start.map_or(n - 1, |v| resolve(v, -1, n - 1));
                        let stop = stop.map_or(-1, |v| resolve(v, -1, n - 1));
                        let count = if start > stop {
                            (start - stop - 1).unsigned_abs() / step.unsigned_abs() + 1
                        } else {
                            0
                        };
                        (if count > 0 { start } else { 0 }, count)
                    }
                };
                Ok(Self {
                    first: first.unsigned_abs(),
                    count,
                    step,
                    dropped: false,
                })
            }
        }
    }

    /// The first selected position.
    #[must_use]
    pub const fn first(&self) -> u64 {
        self.first
    }

    /// The number of selected positions.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// The step between selected positions.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Returns true if the axis is removed from the result.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        self.dropped
    }

    /// The smallest range of positions containing every selected position.
    #[must_use]
    pub fn bounds(&self) -> Range<u64> {
        if self.count == 0 {
            return self.first..self.first;
        }
        let span = (self.count - 1) * self.step.unsigned_abs();
        if self.step > 0 {
            self.first..self.first + span + 1
        } else {
            self.first - span..self.first + 1
        }
    }
}

/// A [`Selection`] resolved against a concrete shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalisedSelection {
    axes: Vec<AxisSelection>,
}

impl NormalisedSelection {
    /// The per-axis selections.
    #[must_use]
    pub fn axes(&self) -> &[AxisSelection] {
        &self.axes
    }

    /// The shape of the selected data, excluding dropped axes.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.axes
            .iter()
            .filter(|axis| !axis.dropped)
            .map(|axis| axis.count)
            .collect()
    }

    /// The indices of the axes kept in the result.
    pub fn retained_axes(&self) -> impl Iterator<Item = usize> + '_ {
        self.axes
            .iter()
            .enumerate()
            .filter_map(|(i, axis)| (!axis.dropped).then_some(i))
    }

    /// The bounding subset of every selected element.
    #[must_use]
    pub fn bounding_subset(&self) -> ArraySubset {
        let ranges: Vec<Range<u64>> = self.axes.iter().map(AxisSelection::bounds).collect();
        ArraySubset::new_with_ranges(&ranges)
    }

    /// Returns true if any axis walks backwards.
    #[must_use]
    pub fn has_negative_step(&self) -> bool {
        self.axes.iter().any(|axis| axis.step < 0)
    }

    /// Compose this selection with `inner`, a selection normalised against the [`shape`](Self::shape) of this selection.
    ///
    /// The result selects from the original array what `inner` selects from the result of this selection.
    /// Returns [`None`] if the dimensionality of `inner` does not match.
    #[must_use]
    pub fn compose(&self, inner: &NormalisedSelection) -> Option<NormalisedSelection> {
        let mut inner_axes = inner.axes.iter();
        let axes = self
            .axes
            .iter()
            .map(|outer| {
                if outer.dropped {
                    return Some(*outer);
                }
                let inner = inner_axes.next()?;
                // only overflows when `inner` selects at most one position
                let step = outer
                    .step
                    .checked_mul(inner.step)
                    .unwrap_or(outer.step.signum() * inner.step.signum());
                if inner.count == 0 {
                    return Some(AxisSelection {
                        first: 0,
                        count: 0,
                        step,
                        dropped: inner.dropped,
                    });
                }
                let first = outer
                    .step
                    .checked_mul(i64::try_from(inner.first).ok()?)?
                    .checked_add(i64::try_from(outer.first).ok()?)?;
                Some(AxisSelection {
                    first: u64::try_from(first).ok()?,
                    count: inner.count,
                    step,
                    dropped: inner.dropped,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        if inner_axes.next().is_some() {
            return None;
        }
        Some(NormalisedSelection { axes })
    }

    /// Express this selection relative to `origin` as a [`Selection`] with non-negative bounds.
    ///
    /// Returns [`None`] if any axis has a negative step or if a selected position is before `origin`.
    #[must_use]
    pub fn relative_to(&self, origin: &[u64]) -> Option<Selection> {
        if origin.len() != self.axes.len() || self.has_negative_step() {
            return None;
        }
        std::iter::zip(&self.axes, origin)
            .map(|(axis, &origin)| {
                let bounds = axis.bounds();
                let start = i64::try_from(bounds.start.checked_sub(origin)?).ok()?;
                if axis.dropped {
                    Some(Slice::Index(start))
                } else {
                    let stop = i64::try_from(bounds.end.checked_sub(origin)?).ok()?;
                    Some(Slice::new(Some(start), Some(stop), Some(axis.step)))
                }
            })
            .collect::<Option<Vec<_>>>()
            .map(Selection)
    }

    /// The per-axis [`ndarray::Slice`]s selecting this selection from an array whose first element is at `origin`.
    ///
    /// Dropped axes are sliced to a single element; see [`retained_axes`](Self::retained_axes).
    pub(crate) fn ndarray_slices(&self, origin: &ArrayIndices) -> Vec<ndarray::Slice> {
        std::iter::zip(&self.axes, origin)
            .map(|(axis, &origin)| {
                let bounds = axis.bounds();
                let start = to_isize(bounds.start.saturating_sub(origin));
                let end = to_isize(bounds.end.saturating_sub(origin));
                let step = isize::try_from(axis.step).unwrap_or(1);
                if axis.count == 0 {
                    ndarray::Slice::new(0, Some(0), 1)
                } else {
                    ndarray::Slice::new(start, Some(end), step)
                }
            })
            .collect()
    }
}

fn to_isize(value: u64) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

/// An invalid selection error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidSelectionError {
    /// More slices than array dimensions.
    #[error("too many indices: got {got} for an array of dimensionality {rank}")]
    TooManyIndices {
        /// The number of slices.
        got: usize,
        /// The array dimensionality.
        rank: usize,
    },
    /// An index is out of range.
    #[error("index {index} is out of range for axis {axis} with size {size}")]
    IndexOutOfRange {
        /// The axis.
        axis: usize,
        /// The requested index.
        index: i64,
        /// The axis size.
        size: u64,
    },
    /// A zero step.
    #[error("slice step cannot be zero (axis {axis})")]
    ZeroStep {
        /// The axis.
        axis: usize,
    },
}

/// A selection parse error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid selection {0:?}")]
pub struct ParseSelectionError(String);

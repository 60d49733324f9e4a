//! The block grid of an array.
//!
//! Remote arrays are stored and served in rectangular blocks.
//! The layout is described per dimension by the list of block lengths along that dimension (e.g. `[[2, 2, 1], [5]]` for a `5x5` array split into three row bands).
//! Block lengths may vary within a dimension, the grid is the cartesian product of the per-dimension partitions.
//!
//! A [`BlockGrid`] maps between element indices and block indices.

use itertools::{izip, Itertools};
use thiserror::Error;

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    selection::{AxisSelection, NormalisedSelection},
    ArrayIndices, ArrayShape,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct OffsetSize {
    offset: u64,
    size: u64,
}

/// A rectangular block grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGrid {
    array_shape: ArrayShape,
    blocks: Vec<Vec<OffsetSize>>,
}

impl BlockGrid {
    /// Create a new block grid for an array with `array_shape` and per-dimension block lengths `chunks`.
    ///
    /// If `chunks` is empty, each dimension is a single block spanning the array.
    ///
    /// # Errors
    /// Returns an [`InvalidBlockGridError`] if the dimensionality of `chunks` does not match `array_shape`,
    /// or if the block lengths of any dimension do not sum to the size of that dimension.
    pub fn new(array_shape: &[u64], chunks: &[Vec<u64>]) -> Result<Self, InvalidBlockGridError> {
        let chunks: Vec<Vec<u64>> = if chunks.is_empty() {
            array_shape.iter().map(|&size| vec![size]).collect()
        } else {
            chunks.to_vec()
        };
        if chunks.len() != array_shape.len() {
            return Err(
                IncompatibleDimensionalityError::new(chunks.len(), array_shape.len()).into(),
            );
        }
        let blocks = izip!(0.., array_shape, chunks)
            .map(|(dimension, &size, lengths)| {
                let total: u64 = lengths.iter().sum();
                if total != size || lengths.is_empty() {
                    return Err(InvalidBlockGridError::InconsistentBlockLengths {
                        dimension,
                        size,
                        lengths,
                    });
                }
                Ok(lengths
                    .iter()
                    .scan(0, |offset, &size| {
                        let last_offset = *offset;
                        *offset += size;
                        Some(OffsetSize {
                            offset: last_offset,
                            size,
                        })
                    })
                    .collect())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            array_shape: array_shape.to_vec(),
            blocks,
        })
    }

    /// The dimensionality of the grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.blocks.len()
    }

    /// The shape of the array covered by the grid.
    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.array_shape
    }

    /// The grid shape (i.e. number of blocks along each dimension).
    #[must_use]
    pub fn grid_shape(&self) -> ArrayShape {
        self.blocks.iter().map(|blocks| blocks.len() as u64).collect()
    }

    /// The total number of blocks.
    #[must_use]
    pub fn num_blocks(&self) -> u64 {
        self.grid_shape().iter().product()
    }

    /// Returns true if `block_indices` are within the grid.
    #[must_use]
    pub fn validate_block_indices(&self, block_indices: &[u64]) -> bool {
        block_indices.len() == self.dimensionality()
            && std::iter::zip(block_indices, &self.blocks)
                .all(|(&index, blocks)| index < blocks.len() as u64)
    }

    /// The subset of the array covered by the block at `block_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidBlockIndicesError`] if `block_indices` are outside of the grid.
    pub fn block_subset(
        &self,
        block_indices: &[u64],
    ) -> Result<ArraySubset, InvalidBlockIndicesError> {
        if !self.validate_block_indices(block_indices) {
            return Err(InvalidBlockIndicesError(
                block_indices.to_vec(),
                self.grid_shape(),
            ));
        }
        let (start, shape) = std::iter::zip(block_indices, &self.blocks)
            .map(|(&index, blocks)| {
                // validated above
                let block = &blocks[usize::try_from(index).unwrap_or(usize::MAX)];
                (block.offset, block.size)
            })
            .unzip();
        ArraySubset::new_with_start_shape(start, shape)
            .map_err(|_| InvalidBlockIndicesError(block_indices.to_vec(), self.grid_shape()))
    }

    /// The shape of the block at `block_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidBlockIndicesError`] if `block_indices` are outside of the grid.
    pub fn block_shape(
        &self,
        block_indices: &[u64],
    ) -> Result<ArrayShape, InvalidBlockIndicesError> {
        Ok(self.block_subset(block_indices)?.shape().to_vec())
    }

    /// The indices of the block containing the element at `array_indices`.
    ///
    /// Returns [`None`] if `array_indices` are outside of the array.
    #[must_use]
    pub fn block_indices(&self, array_indices: &[u64]) -> Option<ArrayIndices> {
        if array_indices.len() != self.dimensionality() {
            return None;
        }
        izip!(array_indices, &self.array_shape, &self.blocks)
            .map(|(&index, &size, blocks)| {
                if index >= size {
                    return None;
                }
                let partition = blocks.partition_point(|block| index >= block.offset);
                Some(partition.saturating_sub(1) as u64)
            })
            .collect()
    }

    /// The block indices of every block intersecting `array_subset`, as a subset of the grid.
    ///
    /// Returns [`None`] if `array_subset` is empty or extends beyond the array.
    #[must_use]
    pub fn blocks_in_subset(&self, array_subset: &ArraySubset) -> Option<ArraySubset> {
        if array_subset.is_empty() || !array_subset.inbounds(&self.array_shape) {
            return None;
        }
        let end_inc: ArrayIndices = array_subset.end_exc().iter().map(|e| e - 1).collect();
        let blocks_start = self.block_indices(array_subset.start())?;
        let blocks_end = self.block_indices(&end_inc)?;
        let blocks_end_exc = blocks_end.iter().map(|e| e + 1).collect();
        ArraySubset::new_with_start_end_exc(blocks_start, blocks_end_exc).ok()
    }

    /// The block indices of every block holding at least one element of `selection`, in C order.
    ///
    /// Unlike [`blocks_in_subset`](Self::blocks_in_subset) on the bounding subset, blocks skipped over by a strided axis are excluded.
    /// Returns an empty list if `selection` is empty or does not match the dimensionality of the grid.
    #[must_use]
    pub fn blocks_in_selection(&self, selection: &NormalisedSelection) -> Vec<ArrayIndices> {
        let axes = selection.axes();
        if axes.len() != self.dimensionality() {
            return Vec::new();
        }
        if axes.is_empty() {
            return vec![vec![]];
        }
        std::iter::zip(axes, &self.blocks)
            .map(|(axis, blocks)| selected_blocks(axis, blocks))
            .multi_cartesian_product()
            .collect()
    }
}

/// The indices of the blocks along one dimension holding a position selected by `axis`.
fn selected_blocks(axis: &AxisSelection, blocks: &[OffsetSize]) -> Vec<u64> {
    let bounds = axis.bounds();
    let step = axis.step().unsigned_abs();
    (0..)
        .zip(blocks)
        .filter(|(_, block)| {
            let block_end = block.offset + block.size;
            if block_end <= bounds.start || block.offset >= bounds.end {
                return false;
            }
            // the first selected position at or after the block start
            let first = if block.offset <= bounds.start {
                bounds.start
            } else {
                bounds.start + (block.offset - bounds.start).div_ceil(step) * step
            };
            first < block_end.min(bounds.end)
        })
        .map(|(index, _)| index)
        .collect()
}

/// An invalid block grid error.
#[derive(Clone, Debug, Error)]
pub enum InvalidBlockGridError {
    /// The block layout dimensionality does not match the array.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// The block lengths of a dimension do not sum to its size.
    #[error("block lengths {lengths:?} of dimension {dimension} do not sum to its size {size}")]
    InconsistentBlockLengths {
        /// The dimension.
        dimension: usize,
        /// The size of the dimension.
        size: u64,
        /// The block lengths.
        lengths: Vec<u64>,
    },
}

/// An invalid block indices error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid block indices {_0:?} for a block grid of shape {_1:?}")]
pub struct InvalidBlockIndicesError(pub ArrayIndices, pub ArrayShape);

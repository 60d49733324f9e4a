use std::fmt::Debug;

use super::{BlockArrayReader, ClientError};
use crate::{
    array_data::{ArrayData, ArrayLike},
    array_subset::IncompatibleDimensionalityError,
    container::{DataArray, Dataset, Variable},
    selection::{NormalisedSelection, Selection},
    structure::DataType,
    ArrayIndices, ArrayShape,
};

/// Decides what a labeled reader produces for the array of each variable.
pub trait ReadPolicy: Clone + Debug + Send + Sync + 'static {
    /// The array type of the containers produced by a read.
    type Array: ArrayLike;

    /// Produce the array of `selection` from `reader`.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the array cannot be produced.
    fn read(
        reader: &BlockArrayReader,
        selection: &NormalisedSelection,
    ) -> Result<Self::Array, ClientError>;
}

/// Fetch data when read.
#[derive(Copy, Clone, Debug, Default)]
pub struct Immediate;

impl ReadPolicy for Immediate {
    type Array = ArrayData;

    fn read(
        reader: &BlockArrayReader,
        selection: &NormalisedSelection,
    ) -> Result<ArrayData, ClientError> {
        reader.read_normalised(selection)
    }
}

/// Fetch nothing when read, producing [`DeferredArray`]s instead.
#[derive(Copy, Clone, Debug, Default)]
pub struct Deferred;

impl ReadPolicy for Deferred {
    type Array = DeferredArray;

    fn read(
        reader: &BlockArrayReader,
        selection: &NormalisedSelection,
    ) -> Result<DeferredArray, ClientError> {
        Ok(DeferredArray {
            reader: reader.clone(),
            selection: selection.clone(),
            data_type: reader.structure()?.data_type.data_type(),
        })
    }
}

/// A selection of a remote array which has not been fetched.
///
/// The shape and data type are known without fetching, the data is fetched by [`compute`](DeferredArray::compute).
#[derive(Clone, Debug)]
pub struct DeferredArray {
    reader: BlockArrayReader,
    selection: NormalisedSelection,
    data_type: DataType,
}

impl DeferredArray {
    /// The selection within the remote array.
    #[must_use]
    pub fn selection(&self) -> &NormalisedSelection {
        &self.selection
    }

    /// The indices of the blocks which [`compute`](DeferredArray::compute) will request.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the block grid is invalid.
    pub fn blocks(&self) -> Result<Vec<ArrayIndices>, ClientError> {
        self.reader.required_blocks(&self.selection)
    }

    /// Select from this array without fetching.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if `selection` is not valid for the shape of this array.
    pub fn select(&self, selection: &Selection) -> Result<Self, ClientError> {
        let shape = self.shape();
        let inner = selection.normalise(&shape)?;
        let selection = self.selection.compose(&inner).ok_or_else(|| {
            IncompatibleDimensionalityError::new(inner.axes().len(), shape.len())
        })?;
        Ok(Self {
            reader: self.reader.clone(),
            selection,
            data_type: self.data_type,
        })
    }

    /// Fetch the data.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if any block request fails.
    pub fn compute(&self) -> Result<ArrayData, ClientError> {
        self.reader.read_normalised(&self.selection)
    }
}

impl ArrayLike for DeferredArray {
    fn shape(&self) -> ArrayShape {
        self.selection.shape()
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl Variable<DeferredArray> {
    /// Fetch the data.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if any block request fails.
    pub fn compute(self) -> Result<Variable, ClientError> {
        self.try_map_data(|array| array.compute())
    }
}

impl DataArray<DeferredArray> {
    /// Fetch the data and coordinates.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if any block request fails.
    pub fn compute(self) -> Result<DataArray, ClientError> {
        self.try_map_data(|array| array.compute())
    }
}

impl Dataset<DeferredArray> {
    /// Fetch every data variable and coordinate.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if any block request fails.
    pub fn compute(self) -> Result<Dataset, ClientError> {
        self.try_map_data(|array| array.compute())
    }
}

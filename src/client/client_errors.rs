use derive_more::Display;
use thiserror::Error;

use crate::{
    array_data::ArrayDataError,
    array_subset::{ArraySubsetError, IncompatibleDimensionalityError},
    block_grid::{InvalidBlockGridError, InvalidBlockIndicesError},
    container::ContainerError,
    selection::InvalidSelectionError,
    structure::{DataType, InvalidStructureError},
    transport::TransportError,
};

/// The kind of node a name was looked up in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum NodeKind {
    /// A data variable of a dataset.
    #[display("data variable")]
    DataVariable,
    /// A coordinate of a dataset or data array.
    #[display("coordinate")]
    Coordinate,
    /// A data variable or coordinate of a dataset.
    #[display("variable or coordinate")]
    Variable,
}

/// A reader error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// A transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Invalid block indices.
    #[error(transparent)]
    InvalidBlockIndices(#[from] InvalidBlockIndicesError),
    /// An invalid selection.
    #[error(transparent)]
    InvalidSelection(#[from] InvalidSelectionError),
    /// A name is not present in the structure.
    #[error("{kind} {name} not found")]
    NotFound {
        /// The kind of node.
        kind: NodeKind,
        /// The name.
        name: String,
    },
    /// The array has no dimensions.
    #[error("the array has no dimensions")]
    ZeroDimensional,
    /// The structure is invalid.
    #[error(transparent)]
    InvalidStructure(#[from] InvalidStructureError),
    /// The transport returned a block of unexpected size.
    #[error("got a block of {got} bytes, expected {expected}")]
    UnexpectedBlockSize {
        /// The number of bytes received.
        got: u64,
        /// The expected number of bytes.
        expected: u64,
    },
    /// The data types do not match.
    #[error("data type {got} does not match {expected}")]
    DataTypeMismatch {
        /// The data type.
        got: DataType,
        /// The expected data type.
        expected: DataType,
    },
    /// The fetched arrays could not be assembled into a container.
    #[error("incompatible dimensions: {_0}")]
    IncompatibleDimensions(String),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// An invalid array subset.
    #[error(transparent)]
    InvalidArraySubset(#[from] ArraySubsetError),
    /// Any other array data error.
    #[error(transparent)]
    ArrayData(ArrayDataError),
}

impl From<InvalidBlockGridError> for ClientError {
    fn from(err: InvalidBlockGridError) -> Self {
        Self::InvalidStructure(err.into())
    }
}

impl From<ArrayDataError> for ClientError {
    fn from(err: ArrayDataError) -> Self {
        match err {
            ArrayDataError::UnexpectedSize { got, expected } => {
                Self::UnexpectedBlockSize { got, expected }
            }
            ArrayDataError::DataTypeMismatch { got, expected } => {
                Self::DataTypeMismatch { got, expected }
            }
            ArrayDataError::InvalidSelection(err) => Self::InvalidSelection(err),
            ArrayDataError::IncompatibleDimensionality(err) => {
                Self::IncompatibleDimensionality(err)
            }
            err => Self::ArrayData(err),
        }
    }
}

impl From<ContainerError> for ClientError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::ZeroDimensional => Self::ZeroDimensional,
            ContainerError::NotFound(name) => Self::NotFound {
                kind: NodeKind::Variable,
                name,
            },
            ContainerError::ArrayData(err) => err.into(),
            err => Self::IncompatibleDimensions(err.to_string()),
        }
    }
}

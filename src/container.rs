//! Labeled array containers.
//!
//! - [`Variable`]: an array with dimension names and attributes.
//! - [`DataArray`]: a named [`Variable`] with coordinate [`Variable`]s.
//! - [`Dataset`]: a collection of named data variables sharing coordinates, with attributes.
//!
//! Containers are generic over the array type.
//! Readers with the [`Immediate`](crate::client::Immediate) policy produce containers of materialised [`ArrayData`](crate::array_data::ArrayData), and readers with the [`Deferred`](crate::client::Deferred) policy produce containers of [`DeferredArray`](crate::client::DeferredArray)s which are fetched by `compute`.

mod data_array;
mod dataset;
mod variable;

pub use data_array::DataArray;
pub use dataset::Dataset;
pub use variable::Variable;

use thiserror::Error;

use crate::{array_data::ArrayDataError, ArrayShape};

/// A container error.
#[derive(Clone, Debug, Error)]
pub enum ContainerError {
    /// The number of dimension names does not match the array dimensionality.
    #[error("dimension names {dims:?} do not match array shape {shape:?}")]
    DimensionMismatch {
        /// The dimension names.
        dims: Vec<String>,
        /// The array shape.
        shape: ArrayShape,
    },
    /// A dimension name is repeated.
    #[error("dimension {_0} is repeated")]
    DuplicateDimension(String),
    /// A dimension has conflicting sizes.
    #[error("dimension {dim} of {name} has size {got}, expected {expected}")]
    SizeConflict {
        /// The variable or coordinate.
        name: String,
        /// The dimension.
        dim: String,
        /// The expected size.
        expected: u64,
        /// The size.
        got: u64,
    },
    /// A coordinate conflicts with a coordinate of the same name.
    #[error("coordinate {_0} conflicts with an existing coordinate of the same name")]
    CoordinateConflict(String),
    /// A name is not a variable or coordinate.
    #[error("{_0} is not a variable or coordinate")]
    NotFound(String),
    /// The variable has no dimensions.
    #[error("the variable has no dimensions")]
    ZeroDimensional,
    /// An array data error.
    #[error(transparent)]
    ArrayData(#[from] ArrayDataError),
}

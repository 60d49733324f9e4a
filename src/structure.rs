//! Structure trees.
//!
//! A structure describes the shapes, dimension names, coordinate names and attributes of remote data, without any array data.
//! Structures are returned by the structure endpoint of a [`Transport`](crate::transport::Transport) as JSON:
//! ```json
//! {
//!     "data_vars": {
//!         "temp": {
//!             "name": "temp",
//!             "variable": {
//!                 "dims": ["x", "y"],
//!                 "data": { "shape": [10, 5], "chunks": [[5, 5], [5]], "data_type": "<f8" },
//!                 "attrs": { "units": "K" }
//!             },
//!             "coords": {}
//!         }
//!     },
//!     "coords": {
//!         "x": { "dims": ["x"], "data": { "shape": [10], "data_type": "<i8" }, "attrs": {} }
//!     },
//!     "attrs": { "title": "example" }
//! }
//! ```

mod element_type;
mod named_map;

pub use element_type::{
    DataType, ElementType, Endianness, UnsupportedElementTypeError, NATIVE_ENDIAN,
};
pub use named_map::NamedMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    block_grid::{BlockGrid, InvalidBlockGridError},
    ArrayShape,
};

/// An attribute mapping, preserving the declared order.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A structure node.
pub trait Structure: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Check the invariants of the structure.
    ///
    /// # Errors
    /// Returns an [`InvalidStructureError`] if an invariant does not hold.
    fn validate(&self) -> Result<(), InvalidStructureError>;
}

/// The structure of a raw array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayStructure {
    /// The array shape.
    pub shape: ArrayShape,
    /// The block lengths along each dimension. Empty for a single block spanning the array.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<Vec<u64>>,
    /// The element type.
    pub data_type: ElementType,
}

impl ArrayStructure {
    /// Create a new array structure.
    #[must_use]
    pub fn new(shape: ArrayShape, chunks: Vec<Vec<u64>>, data_type: ElementType) -> Self {
        Self {
            shape,
            chunks,
            data_type,
        }
    }

    /// Create a new array structure with regular blocks of `block_shape`.
    ///
    /// The last block along each dimension is truncated to the array shape.
    #[must_use]
    pub fn new_regular(shape: ArrayShape, block_shape: &[u64], data_type: ElementType) -> Self {
        let chunks = std::iter::zip(&shape, block_shape)
            .map(|(&size, &block)| {
                if size == 0 || block == 0 {
                    return vec![size];
                }
                let mut lengths = vec![block; usize::try_from(size / block).unwrap_or_default()];
                if size % block != 0 {
                    lengths.push(size % block);
                }
                lengths
            })
            .collect();
        Self::new(shape, chunks, data_type)
    }

    /// The dimensionality of the array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// The number of elements of the array.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// The block grid of the array.
    ///
    /// # Errors
    /// Returns an [`InvalidBlockGridError`] if the block layout does not match the shape.
    pub fn block_grid(&self) -> Result<BlockGrid, InvalidBlockGridError> {
        BlockGrid::new(&self.shape, &self.chunks)
    }
}

impl Structure for ArrayStructure {
    fn validate(&self) -> Result<(), InvalidStructureError> {
        self.block_grid()?;
        Ok(())
    }
}

/// The structure of a labeled array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableStructure {
    /// The dimension names.
    pub dims: Vec<String>,
    /// The array structure.
    pub data: ArrayStructure,
    /// The attributes.
    #[serde(default)]
    pub attrs: Attributes,
}

impl VariableStructure {
    /// Create a new variable structure with no attributes.
    #[must_use]
    pub fn new(dims: Vec<String>, data: ArrayStructure) -> Self {
        Self {
            dims,
            data,
            attrs: Attributes::new(),
        }
    }

    /// Set the attributes.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    /// The size of dimension `dim`, if present.
    #[must_use]
    pub fn dim_size(&self, dim: &str) -> Option<u64> {
        let position = self.dims.iter().position(|d| d == dim)?;
        self.data.shape.get(position).copied()
    }
}

impl Structure for VariableStructure {
    fn validate(&self) -> Result<(), InvalidStructureError> {
        if self.dims.len() != self.data.dimensionality() {
            return Err(InvalidStructureError::DimensionMismatch {
                dims: self.dims.clone(),
                shape: self.data.shape.clone(),
            });
        }
        self.data.validate()
    }
}

/// The structure of a named labeled array with coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataArrayStructure {
    /// The name.
    #[serde(default)]
    pub name: Option<String>,
    /// The data.
    pub variable: VariableStructure,
    /// The coordinates.
    #[serde(default)]
    pub coords: NamedMap<VariableStructure>,
}

impl DataArrayStructure {
    /// Create a new data array structure with no coordinates.
    #[must_use]
    pub fn new(name: Option<String>, variable: VariableStructure) -> Self {
        Self {
            name,
            variable,
            coords: NamedMap::new(),
        }
    }

    /// Add a coordinate.
    #[must_use]
    pub fn with_coord(mut self, name: impl Into<String>, coord: VariableStructure) -> Self {
        self.coords.insert(name, coord);
        self
    }
}

impl Structure for DataArrayStructure {
    fn validate(&self) -> Result<(), InvalidStructureError> {
        self.variable.validate()?;
        for (name, coord) in self.coords.iter() {
            coord.validate()?;
            check_dim_sizes(name, coord, &self.variable)?;
        }
        Ok(())
    }
}

/// The structure of a collection of named labeled arrays sharing coordinates.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetStructure {
    /// The data variables.
    #[serde(default)]
    pub data_vars: NamedMap<DataArrayStructure>,
    /// The shared coordinates.
    #[serde(default)]
    pub coords: NamedMap<VariableStructure>,
    /// The attributes.
    #[serde(default)]
    pub attrs: Attributes,
}

impl DatasetStructure {
    /// Returns true if `name` is a data variable or a coordinate.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.data_vars.contains_key(name) || self.coords.contains_key(name)
    }
}

impl Structure for DatasetStructure {
    fn validate(&self) -> Result<(), InvalidStructureError> {
        for (_, coord) in self.coords.iter() {
            coord.validate()?;
        }
        for (name, data_var) in self.data_vars.iter() {
            data_var.validate()?;
            for (coord_name, coord) in self.coords.iter() {
                check_dim_sizes(coord_name, coord, &data_var.variable)?;
            }
            for (coord_name, coord) in data_var.coords.iter() {
                if let Some(shared) = self.coords.get(coord_name) {
                    if shared.data.shape != coord.data.shape {
                        return Err(InvalidStructureError::SizeConflict {
                            name: format!("{name}.{coord_name}"),
                            expected: shared.data.shape.clone(),
                            got: coord.data.shape.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_dim_sizes(
    name: &str,
    coord: &VariableStructure,
    data: &VariableStructure,
) -> Result<(), InvalidStructureError> {
    for (dim, &size) in std::iter::zip(&coord.dims, &coord.data.shape) {
        if let Some(expected) = data.dim_size(dim) {
            if expected != size {
                return Err(InvalidStructureError::SizeConflict {
                    name: format!("{name}.{dim}"),
                    expected: vec![expected],
                    got: vec![size],
                });
            }
        }
    }
    Ok(())
}

/// An invalid structure error.
#[derive(Clone, Debug, Error)]
pub enum InvalidStructureError {
    /// The structure could not be parsed.
    #[error("failed to parse structure: {_0}")]
    Parse(String),
    /// The number of dimension names does not match the array dimensionality.
    #[error("dimension names {dims:?} do not match array shape {shape:?}")]
    DimensionMismatch {
        /// The dimension names.
        dims: Vec<String>,
        /// The array shape.
        shape: ArrayShape,
    },
    /// The block layout does not match the shape.
    #[error(transparent)]
    BlockGrid(#[from] InvalidBlockGridError),
    /// A coordinate or dimension size conflicts with another declaration.
    #[error("size of {name} is {got:?}, expected {expected:?}")]
    SizeConflict {
        /// The conflicting coordinate or dimension.
        name: String,
        /// The expected size.
        expected: ArrayShape,
        /// The declared size.
        got: ArrayShape,
    },
}

impl From<serde_json::Error> for InvalidStructureError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

use super::ContainerError;
use crate::{
    array_data::{ArrayData, ArrayLike},
    selection::Selection,
    structure::Attributes,
    ArrayShape,
};

/// An array with dimension names and attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable<A = ArrayData> {
    dims: Vec<String>,
    data: A,
    attrs: Attributes,
}

impl<A: ArrayLike> Variable<A> {
    /// Create a new variable.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the number of `dims` does not match the dimensionality of `data` or if a dimension name is repeated.
    pub fn new(dims: Vec<String>, data: A, attrs: Attributes) -> Result<Self, ContainerError> {
        if dims.len() != data.dimensionality() {
            return Err(ContainerError::DimensionMismatch {
                dims,
                shape: data.shape(),
            });
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(ContainerError::DuplicateDimension(dim.clone()));
            }
        }
        Ok(Self { dims, data, attrs })
    }

    /// The dimension names.
    #[must_use]
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    /// The array.
    #[must_use]
    pub fn data(&self) -> &A {
        &self.data
    }

    /// Convert into the array.
    #[must_use]
    pub fn into_data(self) -> A {
        self.data
    }

    /// The attributes.
    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.data.shape()
    }

    /// The size of dimension `dim`, if present.
    #[must_use]
    pub fn dim_size(&self, dim: &str) -> Option<u64> {
        let position = self.dims.iter().position(|d| d == dim)?;
        self.shape().get(position).copied()
    }

    /// The size of the first dimension.
    ///
    /// # Errors
    /// Returns [`ContainerError::ZeroDimensional`] if the variable has no dimensions.
    pub fn len(&self) -> Result<u64, ContainerError> {
        self.shape()
            .first()
            .copied()
            .ok_or(ContainerError::ZeroDimensional)
    }

    /// Transform the array, keeping the dimension names and attributes.
    ///
    /// # Errors
    /// Returns the error of `f`.
    pub fn try_map_data<B: ArrayLike, E>(
        self,
        f: impl FnOnce(A) -> Result<B, E>,
    ) -> Result<Variable<B>, E> {
        Ok(Variable {
            dims: self.dims,
            data: f(self.data)?,
            attrs: self.attrs,
        })
    }
}

impl Variable<ArrayData> {
    /// Select elements with `selection`, removing the dimensions of indexed axes.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if `selection` is not valid for the shape of the variable.
    pub fn select(&self, selection: &Selection) -> Result<Self, ContainerError> {
        let normalised = selection
            .normalise(&self.shape())
            .map_err(crate::array_data::ArrayDataError::from)?;
        let dims = normalised
            .retained_axes()
            .map(|axis| self.dims[axis].clone())
            .collect();
        let data = self.data.select(selection)?;
        Ok(Self {
            dims,
            data,
            attrs: self.attrs.clone(),
        })
    }
}

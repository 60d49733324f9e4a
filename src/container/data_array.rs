use super::{ContainerError, Variable};
use crate::{
    array_data::{ArrayData, ArrayDataError, ArrayLike},
    config::global_config,
    selection::{Selection, Slice},
    structure::{Attributes, NamedMap},
    ArrayShape,
};

/// A named [`Variable`] with coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct DataArray<A = ArrayData> {
    name: Option<String>,
    variable: Variable<A>,
    coords: NamedMap<Variable<A>>,
}

impl<A: ArrayLike> DataArray<A> {
    /// Create a new data array.
    ///
    /// If [validate coordinates](crate::config::Config#validate-coordinates) is enabled, every coordinate dimension shared with `variable` must have the same size.
    ///
    /// # Errors
    /// Returns [`ContainerError::SizeConflict`] if a coordinate dimension size does not match `variable`.
    pub fn new(
        variable: Variable<A>,
        coords: NamedMap<Variable<A>>,
        name: Option<String>,
    ) -> Result<Self, ContainerError> {
        if global_config().validate_coordinates() {
            for (coord_name, coord) in coords.iter() {
                check_shared_dims(coord_name, coord, &variable)?;
            }
        }
        Ok(Self {
            name,
            variable,
            coords,
        })
    }

    /// The name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The data variable.
    #[must_use]
    pub fn variable(&self) -> &Variable<A> {
        &self.variable
    }

    /// Convert into the data variable, discarding the name and coordinates.
    #[must_use]
    pub fn into_variable(self) -> Variable<A> {
        self.variable
    }

    pub(super) fn into_parts(self) -> (Option<String>, Variable<A>, NamedMap<Variable<A>>) {
        (self.name, self.variable, self.coords)
    }

    /// The array.
    #[must_use]
    pub fn data(&self) -> &A {
        self.variable.data()
    }

    /// The dimension names.
    #[must_use]
    pub fn dims(&self) -> &[String] {
        self.variable.dims()
    }

    /// The attributes.
    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        self.variable.attrs()
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.variable.shape()
    }

    /// The size of the first dimension.
    ///
    /// # Errors
    /// Returns [`ContainerError::ZeroDimensional`] if the data array has no dimensions.
    pub fn len(&self) -> Result<u64, ContainerError> {
        self.variable.len()
    }

    /// The coordinates.
    #[must_use]
    pub fn coords(&self) -> &NamedMap<Variable<A>> {
        &self.coords
    }

    /// The coordinate `name`.
    #[must_use]
    pub fn coord(&self, name: &str) -> Option<&Variable<A>> {
        self.coords.get(name)
    }

    /// Transform every array, keeping names, dimension names and attributes.
    ///
    /// # Errors
    /// Returns the first error of `f`.
    pub fn try_map_data<B: ArrayLike, E>(
        self,
        mut f: impl FnMut(A) -> Result<B, E>,
    ) -> Result<DataArray<B>, E> {
        Ok(DataArray {
            name: self.name,
            variable: self.variable.try_map_data(&mut f)?,
            coords: self
                .coords
                .try_map(|_, coord| coord.try_map_data(&mut f))?,
        })
    }
}

impl DataArray<ArrayData> {
    /// Select elements with `selection`.
    ///
    /// Coordinates are selected along their dimensions with the slice of the data dimension of the same name.
    /// Coordinate dimensions which are not dimensions of the data are kept whole.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if `selection` is not valid for the shape of the data.
    pub fn select(&self, selection: &Selection) -> Result<Self, ContainerError> {
        selection
            .normalise(&self.shape())
            .map_err(ArrayDataError::from)?;
        let variable = self.variable.select(selection)?;
        let coords = self.coords.iter().try_fold(
            NamedMap::new(),
            |mut coords, (name, coord)| -> Result<_, ContainerError> {
                let slices: Vec<Slice> = coord
                    .dims()
                    .iter()
                    .map(|dim| {
                        self.dims()
                            .iter()
                            .position(|d| d == dim)
                            .map_or_else(Slice::full, |axis| selection.axis(axis))
                    })
                    .collect();
                coords.insert(name, coord.select(&Selection::new(slices))?);
                Ok(coords)
            },
        )?;
        Ok(Self {
            name: self.name.clone(),
            variable,
            coords,
        })
    }
}

fn check_shared_dims<A: ArrayLike>(
    name: &str,
    coord: &Variable<A>,
    variable: &Variable<A>,
) -> Result<(), ContainerError> {
    for (dim, size) in std::iter::zip(coord.dims(), coord.shape()) {
        if let Some(expected) = variable.dim_size(dim) {
            if expected != size {
                return Err(ContainerError::SizeConflict {
                    name: name.to_string(),
                    dim: dim.clone(),
                    expected,
                    got: size,
                });
            }
        }
    }
    Ok(())
}

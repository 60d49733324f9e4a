use super::{ContainerError, DataArray, Variable};
use crate::{
    array_data::{ArrayData, ArrayLike},
    structure::{Attributes, NamedMap},
};

/// A collection of named data variables sharing coordinates.
///
/// Data variables and coordinates are both addressable by name with [`get_variable`](Dataset::get_variable) and [`contains`](Dataset::contains), but only data variables are iterated by [`names`](Dataset::names) and [`iter`](Dataset::iter).
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset<A = ArrayData> {
    data_vars: NamedMap<DataArrayEntry<A>>,
    coords: NamedMap<Variable<A>>,
    attrs: Attributes,
}

#[derive(Clone, Debug, PartialEq)]
struct DataArrayEntry<A> {
    name: Option<String>,
    variable: Variable<A>,
}

impl<A: ArrayLike> Dataset<A> {
    /// Create a new dataset.
    ///
    /// The coordinates of each data array are merged into `coords`, the first coordinate of each name is kept.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if
    ///  - a dimension has different sizes in different variables, or
    ///  - coordinates of the same name have different shapes.
    pub fn new(
        data_vars: NamedMap<DataArray<A>>,
        coords: NamedMap<Variable<A>>,
        attrs: Attributes,
    ) -> Result<Self, ContainerError> {
        let mut coords = coords;
        let mut entries = NamedMap::new();
        for (name, data_array) in data_vars {
            let (data_name, variable, data_array_coords) = data_array.into_parts();
            for (coord_name, coord) in data_array_coords {
                match coords.get(&coord_name) {
                    Some(existing) if existing.shape() != coord.shape() => {
                        return Err(ContainerError::CoordinateConflict(coord_name));
                    }
                    Some(_) => {}
                    None => {
                        coords.insert(coord_name, coord);
                    }
                }
            }
            entries.insert(
                name,
                DataArrayEntry {
                    name: data_name,
                    variable,
                },
            );
        }

        let dataset = Self {
            data_vars: entries,
            coords,
            attrs,
        };
        dataset.check_dims()?;
        Ok(dataset)
    }

    fn check_dims(&self) -> Result<(), ContainerError> {
        let variables = self
            .coords
            .iter()
            .chain(self.data_vars.iter().map(|(name, entry)| (name, &entry.variable)));
        let mut sizes: NamedMap<u64> = NamedMap::new();
        for (name, variable) in variables {
            for (dim, size) in std::iter::zip(variable.dims(), variable.shape()) {
                match sizes.get(dim) {
                    Some(&expected) if expected != size => {
                        return Err(ContainerError::SizeConflict {
                            name: name.to_string(),
                            dim: dim.clone(),
                            expected,
                            got: size,
                        });
                    }
                    Some(_) => {}
                    None => {
                        sizes.insert(dim.clone(), size);
                    }
                }
            }
        }
        Ok(())
    }

    /// The data variables, without their coordinates.
    pub fn data_vars(&self) -> impl ExactSizeIterator<Item = (&str, &Variable<A>)> {
        self.data_vars
            .iter()
            .map(|(name, entry)| (name, &entry.variable))
    }

    /// The coordinates.
    #[must_use]
    pub fn coords(&self) -> &NamedMap<Variable<A>> {
        &self.coords
    }

    /// The attributes.
    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// The sizes of every dimension, in order of first appearance.
    #[must_use]
    pub fn dims(&self) -> NamedMap<u64> {
        let mut sizes = NamedMap::new();
        let variables = self
            .coords
            .values()
            .chain(self.data_vars.values().map(|entry| &entry.variable));
        for variable in variables {
            for (dim, size) in std::iter::zip(variable.dims(), variable.shape()) {
                if !sizes.contains_key(dim) {
                    sizes.insert(dim.clone(), size);
                }
            }
        }
        sizes
    }

    /// The names of the data variables in order. Coordinates are excluded.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.data_vars.keys()
    }

    /// Iterate over the names of the data variables in order. Coordinates are excluded.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> {
        self.names()
    }

    /// The number of data variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_vars.len()
    }

    /// Returns true if there are no data variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_vars.is_empty()
    }

    /// Returns true if `name` is a data variable or a coordinate.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.data_vars.contains_key(name) || self.coords.contains_key(name)
    }

    /// Returns the data variable or coordinate `name` as a [`DataArray`].
    ///
    /// The data array carries every coordinate whose dimensions are all dimensions of the variable.
    ///
    /// # Errors
    /// Returns [`ContainerError::NotFound`] if `name` is not a data variable or coordinate.
    pub fn get_variable(&self, name: &str) -> Result<DataArray<A>, ContainerError> {
        let (data_name, variable) = if let Some(entry) = self.data_vars.get(name) {
            (entry.name.clone().or_else(|| Some(name.to_string())), entry.variable.clone())
        } else if let Some(coord) = self.coords.get(name) {
            (Some(name.to_string()), coord.clone())
        } else {
            return Err(ContainerError::NotFound(name.to_string()));
        };
        let coords = self
            .coords
            .iter()
            .filter(|(_, coord)| coord.dims().iter().all(|dim| variable.dims().contains(dim)))
            .map(|(coord_name, coord)| (coord_name, coord.clone()))
            .collect();
        DataArray::new(variable, coords, data_name)
    }

    /// Returns a dataset with only the data variables or coordinates in `names`.
    ///
    /// The coordinates whose dimensions are all dimensions of a selected data variable are kept as well.
    ///
    /// # Errors
    /// Returns [`ContainerError::NotFound`] if a name is not a data variable or coordinate.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ContainerError> {
        let mut data_vars = NamedMap::new();
        let mut coord_names: Vec<&str> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if let Some(entry) = self.data_vars.get(name) {
                data_vars.insert(name, entry.clone());
            } else if self.coords.contains_key(name) {
                coord_names.push(name);
            } else {
                return Err(ContainerError::NotFound(name.to_string()));
            }
        }
        let coords = self
            .coords
            .iter()
            .filter(|(coord_name, coord)| {
                coord_names.contains(coord_name)
                    || data_vars.values().any(|entry: &DataArrayEntry<A>| {
                        coord
                            .dims()
                            .iter()
                            .all(|dim| entry.variable.dims().contains(dim))
                    })
            })
            .map(|(coord_name, coord)| (coord_name, coord.clone()))
            .collect();
        Ok(Self {
            data_vars,
            coords,
            attrs: self.attrs.clone(),
        })
    }

    /// Transform every array, keeping names, dimension names and attributes.
    ///
    /// # Errors
    /// Returns the first error of `f`.
    pub fn try_map_data<B: ArrayLike, E>(
        self,
        mut f: impl FnMut(A) -> Result<B, E>,
    ) -> Result<Dataset<B>, E> {
        Ok(Dataset {
            data_vars: self.data_vars.try_map(|_, entry| {
                Ok(DataArrayEntry {
                    name: entry.name,
                    variable: entry.variable.try_map_data(&mut f)?,
                })
            })?,
            coords: self
                .coords
                .try_map(|_, coord| coord.try_map_data(&mut f))?,
            attrs: self.attrs,
        })
    }
}

impl<A: ArrayLike> DataArray<A> {
    /// Convert into a [`Dataset`] with this data array as its only data variable `name`.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the coordinates are inconsistent with the data.
    pub fn into_dataset(self, name: &str) -> Result<Dataset<A>, ContainerError> {
        Dataset::new(
            [(name.to_string(), self)].into_iter().collect(),
            NamedMap::new(),
            Attributes::new(),
        )
    }
}

use std::marker::PhantomData;

use super::{
    ClientError, DataArrayReader, Immediate, NodeKind, ReadPolicy, ReaderBase, ReaderContext,
    VariableReader,
};
use crate::{
    container::{DataArray, Dataset},
    structure::{DatasetStructure, NamedMap},
};

const DEFAULT_ROUTE: &str = "/dataset/block";

/// A key of [`DatasetReader::index`]: a single name or a list of names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetKey {
    /// A single data variable or coordinate.
    Name(String),
    /// A list of data variables or coordinates.
    Names(Vec<String>),
}

impl From<&str> for DatasetKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for DatasetKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Vec<String>> for DatasetKey {
    fn from(names: Vec<String>) -> Self {
        Self::Names(names)
    }
}

impl From<Vec<&str>> for DatasetKey {
    fn from(names: Vec<&str>) -> Self {
        Self::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for DatasetKey {
    fn from(names: &[&str]) -> Self {
        Self::Names(names.iter().map(ToString::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DatasetKey {
    fn from(names: [&str; N]) -> Self {
        Self::Names(names.iter().map(ToString::to_string).collect())
    }
}

/// The result of [`DatasetReader::index`].
#[derive(Clone, Debug, PartialEq)]
pub enum DatasetItem<A> {
    /// A single data variable or coordinate.
    DataArray(DataArray<A>),
    /// A subset of the dataset.
    Dataset(Dataset<A>),
}

impl<A> DatasetItem<A> {
    /// Returns the data array, if this is a single variable.
    #[must_use]
    pub fn into_data_array(self) -> Option<DataArray<A>> {
        match self {
            Self::DataArray(data_array) => Some(data_array),
            Self::Dataset(_) => None,
        }
    }

    /// Returns the dataset, if this is a subset of the dataset.
    #[must_use]
    pub fn into_dataset(self) -> Option<Dataset<A>> {
        match self {
            Self::DataArray(_) => None,
            Self::Dataset(dataset) => Some(dataset),
        }
    }
}

/// A reader of a remote [`Dataset`].
///
/// Data variables are read through [`DataArrayReader`]s and coordinates through [`VariableReader`]s, all on the same route and tagged with the `variable=<name>` query parameter.
/// Data variables and coordinates are addressable by name, but only data variables are iterated.
#[derive(Clone, Debug)]
pub struct DatasetReader<P: ReadPolicy = Immediate> {
    base: ReaderBase<DatasetStructure>,
    _policy: PhantomData<P>,
}

impl<P: ReadPolicy> DatasetReader<P> {
    /// Create a new dataset reader for `context` on the `/dataset/block` route.
    #[must_use]
    pub fn new(context: ReaderContext) -> Self {
        Self {
            base: ReaderBase::new(context, DEFAULT_ROUTE),
            _policy: PhantomData,
        }
    }

    /// Send block requests on `route` instead.
    #[must_use]
    pub fn with_route(self, route: impl Into<String>) -> Self {
        Self {
            base: self.base.with_route(route),
            _policy: PhantomData,
        }
    }

    /// Use a known structure instead of fetching it.
    #[must_use]
    pub fn with_structure(self, structure: DatasetStructure) -> Self {
        Self {
            base: self.base.with_structure(structure),
            _policy: PhantomData,
        }
    }

    /// Read with policy `Q` instead.
    #[must_use]
    pub fn with_policy<Q: ReadPolicy>(self) -> DatasetReader<Q> {
        DatasetReader {
            base: self.base,
            _policy: PhantomData,
        }
    }

    /// The reader context.
    #[must_use]
    pub fn context(&self) -> &ReaderContext {
        &self.base.context
    }

    /// The route of block requests.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.base.route
    }

    /// The dataset structure.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn structure(&self) -> Result<&DatasetStructure, ClientError> {
        self.base.structure()
    }

    /// The readers of the data variables, in declaration order.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn data_vars(&self) -> Result<NamedMap<DataArrayReader<P>>, ClientError> {
        self.data_var_readers(|_| true)
    }

    /// The readers of the coordinates, in declaration order.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn coords(&self) -> Result<NamedMap<VariableReader<P>>, ClientError> {
        self.coord_readers(|_| true)
    }

    /// The reader of the data variable `name`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if there is no data variable `name`.
    pub fn data_var(&self, name: &str) -> Result<DataArrayReader<P>, ClientError> {
        self.data_var_readers(|key| key == name)?
            .remove(name)
            .ok_or_else(|| ClientError::NotFound {
                kind: NodeKind::DataVariable,
                name: name.to_string(),
            })
    }

    /// The reader of the coordinate `name`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if there is no coordinate `name`.
    pub fn coord(&self, name: &str) -> Result<VariableReader<P>, ClientError> {
        self.coord_readers(|key| key == name)?
            .remove(name)
            .ok_or_else(|| ClientError::NotFound {
                kind: NodeKind::Coordinate,
                name: name.to_string(),
            })
    }

    /// The names of the data variables, in declaration order.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn names(&self) -> Result<impl ExactSizeIterator<Item = &str>, ClientError> {
        Ok(self.structure()?.data_vars.keys())
    }

    /// Iterate over the names of the data variables. Coordinates are not included.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn iter(&self) -> Result<impl ExactSizeIterator<Item = &str>, ClientError> {
        self.names()
    }

    /// The number of data variables.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn len(&self) -> Result<usize, ClientError> {
        Ok(self.structure()?.data_vars.len())
    }

    /// Returns true if there are no data variables.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn is_empty(&self) -> Result<bool, ClientError> {
        Ok(self.structure()?.data_vars.is_empty())
    }

    /// Returns true if `name` is a data variable or coordinate.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn contains(&self, name: &str) -> Result<bool, ClientError> {
        Ok(self.structure()?.contains(name))
    }

    /// Read every data variable and coordinate.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if any block request fails or if the variables are inconsistent.
    pub fn read(&self) -> Result<Dataset<P::Array>, ClientError> {
        self.read_filtered(|_| true)
    }

    /// Read the data variables and coordinates named in `columns`.
    ///
    /// Names which are neither data variables nor coordinates are ignored.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if any block request fails or if the variables are inconsistent.
    pub fn read_columns<S: AsRef<str>>(
        &self,
        columns: &[S],
    ) -> Result<Dataset<P::Array>, ClientError> {
        self.read_filtered(|name| columns.iter().any(|column| column.as_ref() == name))
    }

    /// Read the data variable or coordinate `name` as a [`DataArray`].
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if `name` is neither a data variable nor a coordinate.
    pub fn get_variable(&self, name: &str) -> Result<DataArray<P::Array>, ClientError> {
        Ok(self.read_columns(&[name])?.get_variable(name)?)
    }

    /// Read the data variables and coordinates in `names` as a [`Dataset`].
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if a name is neither a data variable nor a coordinate.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset<P::Array>, ClientError> {
        let structure = self.structure()?;
        if let Some(name) = names
            .iter()
            .map(S::as_ref)
            .find(|name| !structure.contains(name))
        {
            return Err(ClientError::NotFound {
                kind: NodeKind::Variable,
                name: name.to_string(),
            });
        }
        self.read_columns(names)
    }

    /// Read a single variable by name or a subset of the dataset by a list of names.
    ///
    /// # Errors
    /// See [`get_variable`](DatasetReader::get_variable) and [`select`](DatasetReader::select).
    pub fn index(&self, key: impl Into<DatasetKey>) -> Result<DatasetItem<P::Array>, ClientError> {
        match key.into() {
            DatasetKey::Name(name) => self.get_variable(&name).map(DatasetItem::DataArray),
            DatasetKey::Names(names) => self.select(&names).map(DatasetItem::Dataset),
        }
    }

    fn read_filtered(
        &self,
        filter: impl Fn(&str) -> bool,
    ) -> Result<Dataset<P::Array>, ClientError> {
        let data_vars = self
            .data_var_readers(&filter)?
            .try_map(|_, reader| reader.read(()))?;
        let coords = self
            .coord_readers(&filter)?
            .try_map(|_, reader| reader.read(()))?;
        Ok(Dataset::new(
            data_vars,
            coords,
            self.structure()?.attrs.clone(),
        )?)
    }

    fn data_var_readers(
        &self,
        filter: impl Fn(&str) -> bool,
    ) -> Result<NamedMap<DataArrayReader<P>>, ClientError> {
        Ok(self
            .structure()?
            .data_vars
            .iter()
            .filter(|&(name, _)| filter(name))
            .map(|(name, structure)| {
                let reader = DataArrayReader::new(self.base.context.tagged("variable", name))
                    .with_route(self.base.route.clone())
                    .with_structure(structure.clone());
                (name, reader)
            })
            .collect())
    }

    fn coord_readers(
        &self,
        filter: impl Fn(&str) -> bool,
    ) -> Result<NamedMap<VariableReader<P>>, ClientError> {
        Ok(self
            .structure()?
            .coords
            .iter()
            .filter(|&(name, _)| filter(name))
            .map(|(name, structure)| {
                let reader = VariableReader::new(self.base.context.tagged("variable", name))
                    .with_route(self.base.route.clone())
                    .with_structure(structure.clone());
                (name, reader)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ndarray::{array, ArrayD, IxDyn};

    use super::*;
    use crate::{
        array_data::ArrayData,
        structure::{ArrayStructure, Attributes, DataArrayStructure, ElementType, VariableStructure},
        transport::{ArrayKey, MemoryTransport},
    };

    fn insert(
        transport: &MemoryTransport,
        key: ArrayKey,
        dims: &[&str],
        data: ArrayData,
    ) -> VariableStructure {
        let block_shape: Vec<u64> = data.shape().iter().map(|&size| size.div_ceil(2)).collect();
        let array = ArrayStructure::new_regular(
            data.shape(),
            &block_shape,
            ElementType::native(data.data_type()),
        );
        transport
            .insert_array("weather", key, array.clone(), data)
            .unwrap();
        VariableStructure::new(dims.iter().map(ToString::to_string).collect(), array)
    }

    fn reader() -> (Arc<MemoryTransport>, DatasetReader) {
        let transport = Arc::new(MemoryTransport::new());
        let temp: ArrayD<f64> =
            ArrayD::from_shape_vec(IxDyn(&[4, 3]), (0..12u8).map(f64::from).collect()).unwrap();
        let x = array![0i32, 10, 20, 30].into_dyn();
        let temp_structure = DataArrayStructure::new(
            Some("temp".to_string()),
            insert(&transport, ArrayKey::variable("temp"), &["x", "y"], temp.into()),
        )
        .with_coord(
            "x",
            insert(
                &transport,
                ArrayKey::variable("temp").with_coord("x"),
                &["x"],
                x.clone().into(),
            ),
        );
        let flag_structure = DataArrayStructure::new(
            Some("flag".to_string()),
            insert(
                &transport,
                ArrayKey::variable("flag"),
                &["x"],
                array![true, false, true, true].into_dyn().into(),
            ),
        );
        let mut attrs = Attributes::new();
        attrs.insert("title".to_string(), "weather".into());
        let structure = DatasetStructure {
            data_vars: [("temp", temp_structure), ("flag", flag_structure)]
                .into_iter()
                .collect(),
            coords: [
                (
                    "x",
                    insert(&transport, ArrayKey::variable("x"), &["x"], x.into()),
                ),
                (
                    "y",
                    insert(
                        &transport,
                        ArrayKey::variable("y"),
                        &["y"],
                        array![0.5f32, 1.5, 2.5].into_dyn().into(),
                    ),
                ),
            ]
            .into_iter()
            .collect(),
            attrs,
        };
        transport.insert_structure("weather", &structure).unwrap();
        let reader = DatasetReader::new(ReaderContext::new(transport.clone(), "weather"));
        (transport, reader)
    }

    #[test]
    fn dataset_reader_names() {
        let (transport, reader) = reader();
        assert_eq!(reader.names().unwrap().collect::<Vec<_>>(), vec!["temp", "flag"]);
        assert_eq!(reader.iter().unwrap().len(), 2);
        assert_eq!(reader.len().unwrap(), 2);
        assert!(reader.contains("y").unwrap());
        assert!(!reader.contains("z").unwrap());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn dataset_reader_sub_readers() {
        let (_transport, reader) = reader();
        let temp = reader.data_var("temp").unwrap();
        assert_eq!(temp.context().params().get("variable"), Some("temp"));
        assert_eq!(temp.route(), "/dataset/block");
        let x = temp.coord("x").unwrap();
        assert_eq!(x.context().params().get("variable"), Some("temp"));
        assert_eq!(x.context().params().get("coord"), Some("x"));
        assert_eq!(
            reader.coord("y").unwrap().context().params().get("variable"),
            Some("y")
        );
        assert!(matches!(
            reader.data_var("x"),
            Err(ClientError::NotFound {
                kind: NodeKind::DataVariable,
                ..
            })
        ));
        assert!(matches!(
            reader.coord("temp"),
            Err(ClientError::NotFound {
                kind: NodeKind::Coordinate,
                ..
            })
        ));
    }

    #[test]
    fn dataset_reader_read() {
        let (_transport, reader) = reader();
        let dataset = reader.read().unwrap();
        assert_eq!(dataset.names().collect::<Vec<_>>(), vec!["temp", "flag"]);
        assert_eq!(dataset.coords().keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(dataset.attrs()["title"], "weather");
        let (_, temp) = dataset.data_vars().next().unwrap();
        assert_eq!(
            temp.data().as_array::<f64>().unwrap().get(IxDyn(&[3, 2])),
            Some(&11.0)
        );
    }

    #[test]
    fn dataset_reader_read_columns() {
        let (transport, reader) = reader();
        let dataset = reader.read_columns(&["flag", "missing"]).unwrap();
        assert_eq!(dataset.names().collect::<Vec<_>>(), vec!["flag"]);
        assert!(dataset.coords().is_empty());
        assert!(transport
            .requests()
            .iter()
            .all(|request| request.params.get("variable") == Some("flag")));
    }

    #[test]
    fn dataset_reader_index() {
        let (_transport, reader) = reader();
        let temp = reader.index("temp").unwrap().into_data_array().unwrap();
        assert_eq!(temp.name(), Some("temp"));
        assert_eq!(temp.shape(), vec![4, 3]);
        assert_eq!(temp.coords().keys().collect::<Vec<_>>(), vec!["x"]);

        let y = reader.index("y").unwrap().into_data_array().unwrap();
        assert_eq!(
            y.data().as_array::<f32>().unwrap(),
            &array![0.5, 1.5, 2.5].into_dyn()
        );

        let subset = reader.index(["flag", "y"]).unwrap().into_dataset().unwrap();
        assert_eq!(subset.names().collect::<Vec<_>>(), vec!["flag"]);
        assert!(subset.coords().contains_key("y"));

        assert!(matches!(
            reader.index("z"),
            Err(ClientError::NotFound { .. })
        ));
        assert!(matches!(
            reader.index(vec!["flag", "z"]),
            Err(ClientError::NotFound { .. })
        ));
    }
}

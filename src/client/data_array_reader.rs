use std::marker::PhantomData;

use super::{
    ClientError, Immediate, NodeKind, ReadPolicy, ReaderBase, ReaderContext, VariableReader,
};
use crate::{
    array_data::ArrayData,
    container::DataArray,
    selection::Selection,
    structure::{DataArrayStructure, NamedMap, VariableStructure},
};

const DEFAULT_ROUTE: &str = "/data_array/block";

/// A reader of a remote [`DataArray`].
///
/// The data variable and each coordinate are read through [`VariableReader`]s on the same route.
/// Coordinate readers are tagged with the `coord=<name>` query parameter.
#[derive(Clone, Debug)]
pub struct DataArrayReader<P: ReadPolicy = Immediate> {
    base: ReaderBase<DataArrayStructure>,
    _policy: PhantomData<P>,
}

impl<P: ReadPolicy> DataArrayReader<P> {
    /// Create a new data array reader for `context` on the `/data_array/block` route.
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
    pub fn with_structure(self, structure: DataArrayStructure) -> Self {
        Self {
            base: self.base.with_structure(structure),
            _policy: PhantomData,
        }
    }

    /// Read with policy `Q` instead.
    #[must_use]
    pub fn with_policy<Q: ReadPolicy>(self) -> DataArrayReader<Q> {
        DataArrayReader {
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

    /// The data array structure.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn structure(&self) -> Result<&DataArrayStructure, ClientError> {
        self.base.structure()
    }

    /// The name of the data array.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn name(&self) -> Result<Option<&str>, ClientError> {
        Ok(self.structure()?.name.as_deref())
    }

    /// The reader of the data variable.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn variable(&self) -> Result<VariableReader<P>, ClientError> {
        Ok(VariableReader::new(self.base.context.clone())
            .with_route(self.base.route.clone())
            .with_structure(self.structure()?.variable.clone()))
    }

    /// The readers of the coordinates, in declaration order.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn coords(&self) -> Result<NamedMap<VariableReader<P>>, ClientError> {
        Ok(self
            .structure()?
            .coords
            .iter()
            .map(|(name, coord)| (name, self.coord_reader(name, coord.clone())))
            .collect())
    }

    /// The reader of the coordinate `name`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if there is no coordinate `name`.
    pub fn coord(&self, name: &str) -> Result<VariableReader<P>, ClientError> {
        let coord = self
            .structure()?
            .coords
            .get(name)
            .ok_or_else(|| ClientError::NotFound {
                kind: NodeKind::Coordinate,
                name: name.to_string(),
            })?;
        Ok(self.coord_reader(name, coord.clone()))
    }

    /// The size of the first dimension.
    ///
    /// # Errors
    /// Returns [`ClientError::ZeroDimensional`] if the data array has no dimensions.
    pub fn len(&self) -> Result<u64, ClientError> {
        self.variable()?.len()
    }

    /// Read the elements of `slice` into a [`DataArray`].
    ///
    /// Coordinates are paired with the slice by position: coordinate `i` is read with the `i`-th slice, or entirely if there is none.
    /// Scalar coordinates are always read entirely.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if `slice` is not valid, if any block request fails, or if the coordinates do not match the data.
    pub fn read(&self, slice: impl Into<Selection>) -> Result<DataArray<P::Array>, ClientError> {
        let selection = slice.into();
        let variable = self.variable()?.read(&selection)?;
        let coords = self
            .coords()?
            .iter()
            .enumerate()
            .map(|(axis, (name, coord))| -> Result<_, ClientError> {
                let slice = match selection.get(axis) {
                    Some(&slice) if !coord.dims()?.is_empty() => Selection::from(slice),
                    _ => Selection::all(),
                };
                Ok((name, coord.read(slice)?))
            })
            .collect::<Result<NamedMap<_>, ClientError>>()?;
        Ok(DataArray::new(
            variable,
            coords,
            self.structure()?.name.clone(),
        )?)
    }

    /// Equivalent to [`read`](DataArrayReader::read).
    ///
    /// # Errors
    /// See [`read`](DataArrayReader::read).
    pub fn index(&self, slice: impl Into<Selection>) -> Result<DataArray<P::Array>, ClientError> {
        self.read(slice)
    }

    /// Read the block at `block` of the data variable and select `slice` within it.
    ///
    /// # Errors
    /// See [`BlockArrayReader::read_block`](super::BlockArrayReader::read_block).
    pub fn read_block(
        &self,
        block: &[u64],
        slice: impl Into<Selection>,
    ) -> Result<ArrayData, ClientError> {
        self.variable()?.read_block(block, slice)
    }

    fn coord_reader(&self, name: &str, structure: VariableStructure) -> VariableReader<P> {
        VariableReader::new(self.base.context.tagged("coord", name))
            .with_route(self.base.route.clone())
            .with_structure(structure)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ndarray::{array, ArrayD, IxDyn};

    use super::*;
    use crate::{
        selection::Slice,
        structure::{ArrayStructure, DataType, ElementType},
        transport::{ArrayKey, MemoryTransport, QueryParams},
    };

    fn insert(
        transport: &MemoryTransport,
        key: ArrayKey,
        dims: &[&str],
        block_shape: &[u64],
        data: ArrayData,
    ) -> VariableStructure {
        let array = ArrayStructure::new_regular(
            data.shape(),
            block_shape,
            ElementType::native(data.data_type()),
        );
        transport
            .insert_array("forecast/temp", key, array.clone(), data)
            .unwrap();
        VariableStructure::new(dims.iter().map(ToString::to_string).collect(), array)
    }

    fn reader() -> (Arc<MemoryTransport>, DataArrayReader) {
        let transport = Arc::new(MemoryTransport::new());
        let data: ArrayD<u16> = ArrayD::from_shape_vec(IxDyn(&[3, 4]), (0..12).collect()).unwrap();
        let variable = insert(&transport, ArrayKey::main(), &["x", "y"], &[2, 2], data.into());
        let x = insert(
            &transport,
            ArrayKey::coord("x"),
            &["x"],
            &[2],
            array![10.0, 20.0, 30.0].into_dyn().into(),
        );
        let y = insert(
            &transport,
            ArrayKey::coord("y"),
            &["y"],
            &[4],
            array![1i64, 2, 3, 4].into_dyn().into(),
        );
        let structure = DataArrayStructure::new(Some("temp".to_string()), variable)
            .with_coord("x", x)
            .with_coord("y", y);
        transport.insert_structure("forecast/temp", &structure).unwrap();
        let reader = DataArrayReader::new(ReaderContext::new(transport.clone(), "forecast/temp"));
        (transport, reader)
    }

    #[test]
    fn data_array_reader_coords() {
        let (transport, reader) = reader();
        assert_eq!(reader.name().unwrap(), Some("temp"));
        assert_eq!(reader.len().unwrap(), 3);
        let coords = reader.coords().unwrap();
        assert_eq!(coords.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        let x = coords.get("x").unwrap();
        assert_eq!(x.context().params().get("coord"), Some("x"));
        assert_eq!(x.route(), "/data_array/block");
        assert!(matches!(
            reader.coord("z"),
            Err(ClientError::NotFound {
                kind: NodeKind::Coordinate,
                ..
            })
        ));
        assert_eq!(transport.structure_requests().len(), 1);
    }

    #[test]
    fn data_array_reader_read() {
        let (transport, reader) = reader();
        let data_array = reader.read([Slice::Index(1), Slice::from(1..3)]).unwrap();
        assert_eq!(data_array.name(), Some("temp"));
        assert_eq!(data_array.dims(), &["y".to_string()]);
        assert_eq!(
            data_array.data().as_array::<u16>().unwrap(),
            &array![5, 6].into_dyn()
        );
        let x = data_array.coord("x").unwrap();
        assert!(x.dims().is_empty());
        assert_eq!(
            x.data().as_array::<f64>().unwrap(),
            &ndarray::arr0(20.0).into_dyn()
        );
        assert_eq!(
            data_array.coord("y").unwrap().data().as_array::<i64>().unwrap(),
            &array![2, 3].into_dyn()
        );

        let requests = transport.requests();
        assert!(requests
            .iter()
            .all(|request| request.route == "/data_array/block"));
        assert_eq!(
            requests
                .iter()
                .filter(|request| request.params.get("coord") == Some("y"))
                .count(),
            1
        );
    }

    #[test]
    fn data_array_reader_read_partial_selection() {
        let (_transport, reader) = reader();
        let data_array = reader.index(Slice::from(..2)).unwrap();
        assert_eq!(data_array.shape(), vec![2, 4]);
        assert_eq!(data_array.coord("x").unwrap().shape(), vec![2]);
        assert_eq!(data_array.coord("y").unwrap().shape(), vec![4]);
    }

    #[test]
    fn data_array_reader_caller_params() {
        let (transport, reader) = reader();
        let context = reader
            .context()
            .clone()
            .with_params(QueryParams::from([("coord", "x")]));
        let reader: DataArrayReader = DataArrayReader::new(context);
        let y = reader.coord("y").unwrap();
        assert_eq!(y.context().params().get("coord"), Some("x"));
        assert_eq!(transport.structure_requests().len(), 1);
    }

    #[test]
    fn data_array_reader_read_block() {
        let (_transport, reader) = reader();
        let block = reader.read_block(&[1, 1], [Slice::Index(0)]).unwrap();
        assert_eq!(block.as_array::<u16>().unwrap(), &array![10, 11].into_dyn());
    }
}

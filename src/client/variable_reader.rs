use std::marker::PhantomData;

use super::{BlockArrayReader, ClientError, Immediate, ReadPolicy, ReaderBase, ReaderContext};
use crate::{
    array_data::ArrayData,
    container::Variable,
    selection::Selection,
    structure::VariableStructure,
};

const DEFAULT_ROUTE: &str = "/variable/block";

/// A reader of a remote [`Variable`].
#[derive(Clone, Debug)]
pub struct VariableReader<P: ReadPolicy = Immediate> {
    base: ReaderBase<VariableStructure>,
    _policy: PhantomData<P>,
}

impl<P: ReadPolicy> VariableReader<P> {
    /// Create a new variable reader for `context` on the `/variable/block` route.
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
    pub fn with_structure(self, structure: VariableStructure) -> Self {
        Self {
            base: self.base.with_structure(structure),
            _policy: PhantomData,
        }
    }

    /// Read with policy `Q` instead.
    #[must_use]
    pub fn with_policy<Q: ReadPolicy>(self) -> VariableReader<Q> {
        VariableReader {
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

    /// The variable structure.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn structure(&self) -> Result<&VariableStructure, ClientError> {
        self.base.structure()
    }

    /// The dimension names.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn dims(&self) -> Result<&[String], ClientError> {
        Ok(&self.structure()?.dims)
    }

    /// The size of the first dimension.
    ///
    /// # Errors
    /// Returns [`ClientError::ZeroDimensional`] if the variable has no dimensions.
    pub fn len(&self) -> Result<u64, ClientError> {
        self.structure()?
            .data
            .shape
            .first()
            .copied()
            .ok_or(ClientError::ZeroDimensional)
    }

    /// Read the elements of `slice` into a [`Variable`].
    ///
    /// The dimensions of indexed axes are removed, the attributes are kept.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if `slice` is not valid for the variable shape or if any block request fails.
    pub fn read(&self, slice: impl Into<Selection>) -> Result<Variable<P::Array>, ClientError> {
        let structure = self.structure()?;
        let selection = slice.into().normalise(&structure.data.shape)?;
        let dims = selection
            .retained_axes()
            .map(|axis| structure.dims[axis].clone())
            .collect();
        let data = P::read(&self.array_reader()?, &selection)?;
        Ok(Variable::new(dims, data, structure.attrs.clone())?)
    }

    /// Equivalent to [`read`](VariableReader::read).
    ///
    /// # Errors
    /// See [`read`](VariableReader::read).
    pub fn index(&self, slice: impl Into<Selection>) -> Result<Variable<P::Array>, ClientError> {
        self.read(slice)
    }

    /// Read the block at `block` and select `slice` within it.
    ///
    /// # Errors
    /// See [`BlockArrayReader::read_block`].
    pub fn read_block(
        &self,
        block: &[u64],
        slice: impl Into<Selection>,
    ) -> Result<ArrayData, ClientError> {
        self.array_reader()?.read_block(block, slice)
    }

    fn array_reader(&self) -> Result<BlockArrayReader, ClientError> {
        Ok(BlockArrayReader::new(self.base.context.clone())
            .with_route(self.base.route.clone())
            .with_structure(self.structure()?.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ndarray::{array, ArrayD, IxDyn};

    use super::*;
    use crate::{
        selection::Slice,
        structure::{ArrayStructure, Attributes, DataType, ElementType},
        transport::{ArrayKey, MemoryTransport, QueryParams},
    };

    fn reader() -> (Arc<MemoryTransport>, VariableReader) {
        let transport = Arc::new(MemoryTransport::new());
        let array = ArrayStructure::new_regular(
            vec![4, 6],
            &[2, 3],
            ElementType::native(DataType::Float32),
        );
        let mut attrs = Attributes::new();
        attrs.insert("units".to_string(), "K".into());
        let structure =
            VariableStructure::new(vec!["y".into(), "x".into()], array.clone()).with_attrs(attrs);
        let data: ArrayD<f32> =
            ArrayD::from_shape_vec(IxDyn(&[4, 6]), (0..24u8).map(f32::from).collect()).unwrap();
        transport.insert_structure("temp", &structure).unwrap();
        transport
            .insert_array("temp", ArrayKey::main(), array, data.into())
            .unwrap();
        let context = ReaderContext::new(transport.clone(), "temp")
            .with_params(QueryParams::from([("expand", "true")]));
        (transport, VariableReader::new(context))
    }

    #[test]
    fn variable_reader_read() {
        let (transport, reader) = reader();
        assert_eq!(reader.len().unwrap(), 4);
        assert_eq!(reader.dims().unwrap(), &["y".to_string(), "x".to_string()]);

        let variable = reader.read([Slice::Index(1), Slice::from(2..5)]).unwrap();
        assert_eq!(variable.dims(), &["x".to_string()]);
        assert_eq!(variable.attrs()["units"], "K");
        assert_eq!(
            variable.data().as_array::<f32>().unwrap(),
            &array![8.0, 9.0, 10.0].into_dyn()
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|request| request.route == "/variable/block"));
        assert!(requests
            .iter()
            .all(|request| request.params.get("expand") == Some("true")));
        assert_eq!(transport.structure_requests().len(), 1);
    }

    #[test]
    fn variable_reader_index() {
        let (_transport, reader) = reader();
        let variable = reader.index(()).unwrap();
        assert_eq!(variable.shape(), vec![4, 6]);
        assert_eq!(variable.dims().len(), 2);
        let variable = reader.index(Slice::Index(-1)).unwrap();
        assert_eq!(variable.dims(), &["x".to_string()]);
        assert_eq!(variable.shape(), vec![6]);
    }

    #[test]
    fn variable_reader_read_block() {
        let (_transport, reader) = reader();
        let block = reader.read_block(&[1, 1], ()).unwrap();
        assert_eq!(
            block.as_array::<f32>().unwrap(),
            &array![[15.0, 16.0, 17.0], [21.0, 22.0, 23.0]].into_dyn()
        );
    }

    #[test]
    fn variable_reader_zero_dimensional() {
        let transport = Arc::new(MemoryTransport::new());
        let array = ArrayStructure::new(vec![], vec![], ElementType::native(DataType::Int64));
        let structure = VariableStructure::new(vec![], array.clone());
        transport.insert_structure("scalar", &structure).unwrap();
        transport
            .insert_array(
                "scalar",
                ArrayKey::main(),
                array,
                ndarray::arr0(7i64).into_dyn().into(),
            )
            .unwrap();
        let reader: VariableReader = VariableReader::new(ReaderContext::new(transport, "scalar"));
        assert!(matches!(reader.len(), Err(ClientError::ZeroDimensional)));
        let variable = reader.read(()).unwrap();
        assert_eq!(
            variable.data().as_array::<i64>().unwrap(),
            &ndarray::arr0(7).into_dyn()
        );
    }
}

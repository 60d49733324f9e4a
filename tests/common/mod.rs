#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use ndarray::{ArrayD, IxDyn};
use tiled_array_client::{
    array_data::ArrayData,
    structure::{
        ArrayStructure, Attributes, DataArrayStructure, DatasetStructure, ElementType,
        VariableStructure,
    },
    transport::{ArrayKey, BlockRequest, MemoryTransport, QueryParams, Transport, TransportError},
    ArrayIndices,
};

pub const PATH: &str = "/archive/weather";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn insert(
    transport: &MemoryTransport,
    path: &str,
    key: ArrayKey,
    dims: &[&str],
    chunks: Vec<Vec<u64>>,
    data: ArrayData,
) -> Result<VariableStructure, Box<dyn std::error::Error>> {
    let array = ArrayStructure::new(data.shape(), chunks, ElementType::native(data.data_type()));
    transport.insert_array(path, key, array.clone(), data)?;
    Ok(VariableStructure::new(
        dims.iter().map(ToString::to_string).collect(),
        array,
    ))
}

pub fn temp_data() -> ArrayData {
    ArrayD::<f64>::from_shape_vec(
        IxDyn(&[10, 5]),
        (0..50u8).map(|i| 250.0 + f64::from(i) / 2.0).collect(),
    )
    .unwrap()
    .into()
}

pub fn temp_attrs() -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("units".to_string(), "K".into());
    attrs.insert("long_name".to_string(), "air temperature".into());
    attrs
}

/// A dataset with data variables `temp(x, y)` and `pressure(x)`, and coordinates `x` (10) and `y` (5).
pub fn weather() -> Result<Arc<MemoryTransport>, Box<dyn std::error::Error>> {
    let transport = Arc::new(MemoryTransport::new());
    let x: ArrayData = ndarray::Array1::from_iter(0..10i64).into_dyn().into();
    let y: ArrayData = ndarray::array![-2.0f32, -1.0, 0.0, 1.0, 2.0].into_dyn().into();
    let pressure: ArrayData = ndarray::Array1::from_iter((0..10u32).map(|i| 1000 + i))
        .into_dyn()
        .into();

    let temp = insert(
        &transport,
        PATH,
        ArrayKey::variable("temp"),
        &["x", "y"],
        vec![vec![4, 4, 2], vec![3, 2]],
        temp_data(),
    )?
    .with_attrs(temp_attrs());
    let temp = DataArrayStructure::new(Some("temp".to_string()), temp)
        .with_coord(
            "x",
            insert(
                &transport,
                PATH,
                ArrayKey::variable("temp").with_coord("x"),
                &["x"],
                vec![vec![5, 5]],
                x.clone(),
            )?,
        )
        .with_coord(
            "y",
            insert(
                &transport,
                PATH,
                ArrayKey::variable("temp").with_coord("y"),
                &["y"],
                vec![],
                y.clone(),
            )?,
        );
    let pressure = DataArrayStructure::new(
        Some("pressure".to_string()),
        insert(
            &transport,
            PATH,
            ArrayKey::variable("pressure"),
            &["x"],
            vec![vec![3, 3, 3, 1]],
            pressure,
        )?,
    );

    let mut attrs = Attributes::new();
    attrs.insert("title".to_string(), "station weather".into());
    let structure = DatasetStructure {
        data_vars: [("temp", temp), ("pressure", pressure)].into_iter().collect(),
        coords: [
            (
                "x",
                insert(&transport, PATH, ArrayKey::variable("x"), &["x"], vec![vec![10]], x)?,
            ),
            (
                "y",
                insert(&transport, PATH, ArrayKey::variable("y"), &["y"], vec![vec![2, 3]], y)?,
            ),
        ]
        .into_iter()
        .collect(),
        attrs,
    };
    transport.insert_structure(PATH, &structure)?;
    Ok(transport)
}

pub const DATA_ARRAY_PATH: &str = "/archive/temp";

/// A standalone data array `temp(x, y)` with coordinates `x` (10) and `y` (5).
pub fn temp() -> Result<Arc<MemoryTransport>, Box<dyn std::error::Error>> {
    let transport = Arc::new(MemoryTransport::new());
    let variable = insert(
        &transport,
        DATA_ARRAY_PATH,
        ArrayKey::main(),
        &["x", "y"],
        vec![vec![3, 3, 3, 1], vec![2, 2, 1]],
        temp_data(),
    )?
    .with_attrs(temp_attrs());
    let x = insert(
        &transport,
        DATA_ARRAY_PATH,
        ArrayKey::coord("x"),
        &["x"],
        vec![vec![4, 6]],
        ndarray::Array1::from_iter(0..10i64).into_dyn().into(),
    )?;
    let y = insert(
        &transport,
        DATA_ARRAY_PATH,
        ArrayKey::coord("y"),
        &["y"],
        vec![],
        ndarray::array![-2.0f32, -1.0, 0.0, 1.0, 2.0].into_dyn().into(),
    )?;
    let structure = DataArrayStructure::new(Some("temp".to_string()), variable)
        .with_coord("x", x)
        .with_coord("y", y);
    transport.insert_structure(DATA_ARRAY_PATH, &structure)?;
    Ok(transport)
}

/// How a [`FaultyTransport`] mishandles the requests for its target block.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Fail with a `503` status.
    Unavailable,
    /// Drop the last `n` bytes of the block.
    Truncate(usize),
}

/// Serves from a [`MemoryTransport`] but applies a [`Fault`] to one block of the untagged array.
#[derive(Debug)]
pub struct FaultyTransport {
    inner: Arc<MemoryTransport>,
    block: ArrayIndices,
    fault: Fault,
}

impl FaultyTransport {
    pub fn new(inner: Arc<MemoryTransport>, block: ArrayIndices, fault: Fault) -> Self {
        Self {
            inner,
            block,
            fault,
        }
    }
}

impl Transport for FaultyTransport {
    fn fetch_structure(&self, path: &str, params: &QueryParams) -> Result<Bytes, TransportError> {
        self.inner.fetch_structure(path, params)
    }

    fn fetch_block(&self, request: &BlockRequest) -> Result<Bytes, TransportError> {
        let bytes = self.inner.fetch_block(request)?;
        if request.block != self.block || !request.params.is_empty() {
            return Ok(bytes);
        }
        match self.fault {
            Fault::Unavailable => Err(TransportError::Status {
                status: 503,
                message: format!("block {request} unavailable"),
            }),
            Fault::Truncate(n) => Ok(bytes.slice(..bytes.len().saturating_sub(n))),
        }
    }
}

mod common;

use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};
use tiled_array_client::{
    array_data::ArrayData,
    client::{ClientError, DataArrayReader, Deferred, ReaderContext},
    config::global_config_mut,
    selection::Slice,
    structure::{ArrayStructure, DataArrayStructure, DataType, ElementType, VariableStructure},
    transport::{ArrayKey, MemoryTransport, TransportError, TransportHandle},
};

use common::{init_logger, Fault, FaultyTransport, DATA_ARRAY_PATH};

fn faulty_reader(
    block: Vec<u64>,
    fault: Fault,
) -> Result<DataArrayReader, Box<dyn std::error::Error>> {
    init_logger();
    let transport: TransportHandle = Arc::new(FaultyTransport::new(common::temp()?, block, fault));
    Ok(DataArrayReader::new(ReaderContext::new(transport, DATA_ARRAY_PATH)))
}

#[test]
fn failed_block_fails_read() -> Result<(), Box<dyn std::error::Error>> {
    let reader = faulty_reader(vec![1, 0], Fault::Unavailable)?;
    for block_concurrent_limit in [1, 4] {
        global_config_mut().set_block_concurrent_limit(block_concurrent_limit);
        match reader.read(()) {
            Err(ClientError::Transport(TransportError::Status { status, message })) => {
                assert_eq!(status, 503);
                assert_eq!(message, "block /data_array/block/archive/temp?block=1,0 unavailable");
            }
            result => panic!("unexpected result {result:?}"),
        }
        assert!(matches!(
            reader.variable()?.read([Slice::from(2..7), Slice::Index(0)]),
            Err(ClientError::Transport(TransportError::Status { status: 503, .. }))
        ));
    }

    // rows 0..3 are in the first row of blocks
    let read = reader.read([Slice::from(0..3)])?;
    assert_eq!(read.shape(), vec![3, 5]);
    Ok(())
}

#[test]
fn failed_block_fails_deferred_compute() -> Result<(), Box<dyn std::error::Error>> {
    let reader = faulty_reader(vec![1, 0], Fault::Unavailable)?.with_policy::<Deferred>();
    let deferred = reader.read(())?;
    assert_eq!(deferred.shape(), vec![10, 5]);
    assert!(matches!(
        deferred.compute(),
        Err(ClientError::Transport(TransportError::Status { status: 503, .. }))
    ));
    Ok(())
}

#[test]
fn truncated_block_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let reader = faulty_reader(vec![0, 0], Fault::Truncate(8))?;
    // block (0, 0) is 3x2 float64
    assert!(matches!(
        reader.read(()),
        Err(ClientError::UnexpectedBlockSize {
            got: 40,
            expected: 48
        })
    ));
    assert!(matches!(
        reader.read_block(&[0, 0], ()),
        Err(ClientError::UnexpectedBlockSize {
            got: 40,
            expected: 48
        })
    ));
    assert_eq!(reader.read_block(&[0, 1], ())?.shape(), vec![3, 2]);
    Ok(())
}

#[test]
fn data_array_len_zero_dimensional() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let transport = Arc::new(MemoryTransport::new());
    let array = ArrayStructure::new(vec![], vec![], ElementType::native(DataType::Float64));
    let data: ArrayData = ArrayD::<f64>::from_shape_vec(IxDyn(&[]), vec![1.5])?.into();
    transport.insert_array("/archive/scalar", ArrayKey::main(), array.clone(), data)?;
    let structure = DataArrayStructure::new(
        Some("scalar".to_string()),
        VariableStructure::new(vec![], array),
    );
    transport.insert_structure("/archive/scalar", &structure)?;

    let reader: DataArrayReader = DataArrayReader::new(ReaderContext::new(
        transport.clone(),
        "/archive/scalar",
    ));
    assert!(matches!(reader.len(), Err(ClientError::ZeroDimensional)));
    assert_eq!(reader.structure()?.variable.data.shape, Vec::<u64>::new());
    Ok(())
}

use rayon::prelude::*;

use super::{ClientError, ReaderBase, ReaderContext};
use crate::{
    array_data::ArrayData,
    array_subset::ArraySubset,
    block_grid::BlockGrid,
    config::global_config,
    selection::{NormalisedSelection, Selection, Slice},
    structure::ArrayStructure,
    transport::BlockRequest,
    ArrayIndices, ArrayShape,
};

const DEFAULT_ROUTE: &str = "/array/block";

/// A reader of a blocked remote array.
///
/// Reads are split into per-block requests, see [`read`](BlockArrayReader::read).
#[derive(Clone, Debug)]
pub struct BlockArrayReader {
    base: ReaderBase<ArrayStructure>,
}

impl BlockArrayReader {
    /// Create a new array reader for `context` on the `/array/block` route.
    ///
    /// The structure is fetched on first use.
    #[must_use]
    pub fn new(context: ReaderContext) -> Self {
        Self {
            base: ReaderBase::new(context, DEFAULT_ROUTE),
        }
    }

    /// Send block requests on `route` instead.
    #[must_use]
    pub fn with_route(self, route: impl Into<String>) -> Self {
        Self {
            base: self.base.with_route(route),
        }
    }

    /// Use a known structure instead of fetching it.
    #[must_use]
    pub fn with_structure(self, structure: ArrayStructure) -> Self {
        Self {
            base: self.base.with_structure(structure),
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

    /// The array structure.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn structure(&self) -> Result<&ArrayStructure, ClientError> {
        self.base.structure()
    }

    /// The array shape.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn shape(&self) -> Result<ArrayShape, ClientError> {
        Ok(self.structure()?.shape.clone())
    }

    /// The block grid of the array.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if the structure cannot be fetched or is invalid.
    pub fn block_grid(&self) -> Result<BlockGrid, ClientError> {
        Ok(self.structure()?.block_grid()?)
    }

    /// Read the block at `block` and select `slice` within it.
    ///
    /// The slice is resolved against the shape of the block and sent with the request unless it is empty.
    ///
    /// # Errors
    /// Returns a [`ClientError`] if
    ///  - `block` is not a valid block of the grid,
    ///  - `slice` is not valid for the block shape,
    ///  - the request fails, or
    ///  - the transport returns a block of unexpected size.
    pub fn read_block(
        &self,
        block: &[u64],
        slice: impl Into<Selection>,
    ) -> Result<ArrayData, ClientError> {
        let slice = slice.into();
        let structure = self.structure()?;
        let block_subset = structure.block_grid()?.block_subset(block)?;
        let selection = slice.normalise(block_subset.shape())?;
        let slice = (!slice.is_empty()).then_some(slice);
        self.fetch(structure, block, slice, &selection.shape())
    }

    /// Read the elements of `slice`.
    ///
    /// Only the blocks holding a selected element are requested, each trimmed to the bounding region of the selection.
    /// If a single block is needed, the selection is sent with the request as is.
    /// An empty selection issues no request.
    ///
    /// Blocks are fetched in parallel up to the [block concurrent limit](crate::config::Config#block-concurrent-limit).
    ///
    /// # Errors
    /// Returns a [`ClientError`] if `slice` is not valid for the array shape or if any block request fails.
    pub fn read(&self, slice: impl Into<Selection>) -> Result<ArrayData, ClientError> {
        let selection = slice.into().normalise(&self.structure()?.shape)?;
        self.read_normalised(&selection)
    }

    /// The indices of the blocks required to read `selection`.
    pub(crate) fn required_blocks(
        &self,
        selection: &NormalisedSelection,
    ) -> Result<Vec<ArrayIndices>, ClientError> {
        Ok(self.block_grid()?.blocks_in_selection(selection))
    }

    pub(crate) fn read_normalised(
        &self,
        selection: &NormalisedSelection,
    ) -> Result<ArrayData, ClientError> {
        let structure = self.structure()?;
        let grid = structure.block_grid()?;
        let data_type = structure.data_type.data_type();
        let blocks = grid.blocks_in_selection(selection);
        if blocks.is_empty() {
            return Ok(ArrayData::zeros(data_type, &selection.shape())?);
        }

        if let [block] = blocks.as_slice() {
            let block_subset = grid.block_subset(block)?;
            if let Some(slice) = selection.relative_to(block_subset.start()) {
                let slice = (!covers_block(&slice, block_subset.shape())).then_some(slice);
                return self.fetch(structure, block, slice, &selection.shape());
            }
        }

        let bounding = selection.bounding_subset();
        let fetch_overlap = |block: ArrayIndices| -> Result<(ArraySubset, ArrayData), ClientError> {
            let block_subset = grid.block_subset(&block)?;
            let overlap = block_subset.overlap(&bounding)?;
            let local = overlap.relative_to(block_subset.start())?;
            let slice = (local.shape() != block_subset.shape()).then(|| {
                Selection::new(
                    local
                        .to_ranges()
                        .into_iter()
                        .map(|range| Slice::from(to_i64(range.start)..to_i64(range.end)))
                        .collect(),
                )
            });
            let data = self.fetch(structure, &block, slice, local.shape())?;
            Ok((overlap.relative_to(bounding.start())?, data))
        };

        let block_concurrent_limit = global_config().block_concurrent_limit();
        let parts = if block_concurrent_limit <= 1 || blocks.len() == 1 {
            blocks
                .into_iter()
                .map(fetch_overlap)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            blocks
                .into_par_iter()
                .by_uniform_blocks(block_concurrent_limit)
                .map(fetch_overlap)
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut output = ArrayData::zeros(data_type, bounding.shape())?;
        for (subset, data) in &parts {
            output.assign(subset, data)?;
        }
        Ok(output.apply(selection, bounding.start())?)
    }

    fn fetch(
        &self,
        structure: &ArrayStructure,
        block: &[u64],
        slice: Option<Selection>,
        expected_shape: &[u64],
    ) -> Result<ArrayData, ClientError> {
        let request = BlockRequest {
            route: self.base.route.clone(),
            path: self.base.context.path.clone(),
            params: self.base.context.params.clone(),
            block: block.to_vec(),
            slice,
        };
        log::debug!("requesting {request}");
        let bytes = self.base.context.transport.fetch_block(&request)?;
        Ok(ArrayData::from_bytes(
            &bytes,
            structure.data_type,
            expected_shape,
        )?)
    }
}

/// Returns true if `slice`, relative to the start of a block, selects the whole block.
fn covers_block(slice: &Selection, block_shape: &[u64]) -> bool {
    slice.len() == block_shape.len()
        && std::iter::zip(slice.iter(), block_shape).all(|(slice, &size)| match *slice {
            Slice::Range {
                start: Some(0),
                stop: Some(stop),
                step: None | Some(1),
            } => stop == to_i64(size),
            slice => slice.is_full(),
        })
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ndarray::{array, ArrayD, IxDyn};

    use super::*;
    use crate::{
        structure::{DataType, ElementType, Endianness},
        transport::{ArrayKey, MemoryTransport},
    };

    fn source() -> ArrayData {
        ArrayD::<i32>::from_shape_vec(IxDyn(&[5, 4]), (0..20).collect())
            .unwrap()
            .into()
    }

    fn reader() -> (Arc<MemoryTransport>, BlockArrayReader) {
        let transport = Arc::new(MemoryTransport::new());
        let structure = ArrayStructure::new(
            vec![5, 4],
            vec![vec![2, 2, 1], vec![3, 1]],
            ElementType::new(DataType::Int32, Endianness::Big),
        );
        transport.insert_structure("group/array", &structure).unwrap();
        transport
            .insert_array("group/array", ArrayKey::main(), structure, source())
            .unwrap();
        let reader = BlockArrayReader::new(ReaderContext::new(transport.clone(), "group/array"));
        (transport, reader)
    }

    #[test]
    fn block_array_reader_structure() {
        let (transport, reader) = reader();
        assert!(transport.structure_requests().is_empty());
        assert_eq!(reader.shape().unwrap(), vec![5, 4]);
        assert_eq!(reader.block_grid().unwrap().grid_shape(), vec![3, 2]);
        assert_eq!(reader.route(), "/array/block");
        assert_eq!(transport.structure_requests(), vec!["group/array"]);
    }

    #[test]
    fn block_array_reader_read_block() {
        let (transport, reader) = reader();
        let block = reader.read_block(&[1, 0], ()).unwrap();
        assert_eq!(
            block.as_array::<i32>().unwrap(),
            &array![[8, 9, 10], [12, 13, 14]].into_dyn()
        );
        let block = reader.read_block(&[2, 1], [Slice::Index(0)]).unwrap();
        assert_eq!(block.as_array::<i32>().unwrap(), &array![19].into_dyn());

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].slice, None);
        assert_eq!(requests[1].slice, Some(Selection::from(Slice::Index(0))));
        assert_eq!(
            requests[0].to_string(),
            "/array/block/group/array?block=1,0"
        );

        assert!(matches!(
            reader.read_block(&[3, 0], ()),
            Err(ClientError::InvalidBlockIndices(_))
        ));
    }

    #[test]
    fn block_array_reader_read() {
        let (transport, reader) = reader();
        let selections = [
            Selection::all(),
            Selection::from([Slice::from(1..4), Slice::from(2..)]),
            Selection::from([Slice::Index(-1), Slice::from(..)]),
            Selection::from([Slice::new(None, None, Some(-2)), Slice::Index(3)]),
            Selection::from([Slice::new(Some(0), Some(5), Some(3))]),
        ];
        for selection in selections {
            let expected = source().select(&selection).unwrap();
            assert_eq!(reader.read(&selection).unwrap(), expected, "{selection}");
        }

        transport.clear_requests();
        reader.read([Slice::from(1..4), Slice::from(2..)]).unwrap();
        let mut blocks: Vec<_> = transport.requests().into_iter().map(|r| r.block).collect();
        blocks.sort();
        assert_eq!(
            blocks,
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
    }

    #[test]
    fn block_array_reader_read_single_block() {
        let (transport, reader) = reader();
        let data = reader.read([Slice::from(2..4), Slice::Index(1)]).unwrap();
        assert_eq!(data.as_array::<i32>().unwrap(), &array![9, 13].into_dyn());
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].block, vec![1, 0]);
        assert_eq!(requests[0].slice.as_ref().unwrap().to_string(), "0:2:1,1");

        transport.clear_requests();
        reader.read([Slice::from(2..4), Slice::from(0..3)]).unwrap();
        assert_eq!(transport.requests()[0].slice, None);
    }

    #[test]
    fn block_array_reader_read_empty() {
        let (transport, reader) = reader();
        let data = reader.read([Slice::from(3..3)]).unwrap();
        assert_eq!(data.shape(), vec![0, 4]);
        assert_eq!(data.data_type(), DataType::Int32);
        assert!(transport.requests().is_empty());

        assert!(matches!(
            reader.read([Slice::Index(5)]),
            Err(ClientError::InvalidSelection(_))
        ));
    }

    #[test]
    fn block_array_reader_required_blocks() {
        let (_transport, reader) = reader();
        let selection = Selection::from([Slice::from(3..), Slice::Index(0)])
            .normalise(&[5, 4])
            .unwrap();
        assert_eq!(
            reader.required_blocks(&selection).unwrap(),
            vec![vec![1, 0], vec![2, 0]]
        );
    }

    #[test]
    fn block_array_reader_read_strided_skips_blocks() {
        let transport = Arc::new(MemoryTransport::new());
        let structure = ArrayStructure::new(
            vec![10],
            vec![vec![2, 2, 2, 2, 2]],
            ElementType::native(DataType::UInt16),
        );
        let data: ArrayData = ndarray::Array1::from_iter(0..10u16).into_dyn().into();
        transport
            .insert_array("strided", ArrayKey::main(), structure.clone(), data.clone())
            .unwrap();
        let reader = BlockArrayReader::new(ReaderContext::new(transport.clone(), "strided"))
            .with_structure(structure);

        let selection = Selection::from(Slice::new(None, None, Some(9)));
        let normalised = selection.normalise(&[10]).unwrap();
        assert_eq!(
            reader.required_blocks(&normalised).unwrap(),
            vec![vec![0], vec![4]]
        );
        let read = reader.read(&selection).unwrap();
        assert_eq!(read.as_array::<u16>().unwrap(), &array![0, 9].into_dyn());
        let mut blocks: Vec<_> = transport.requests().into_iter().map(|r| r.block).collect();
        blocks.sort();
        assert_eq!(blocks, vec![vec![0], vec![4]]);

        for selection in [
            Selection::from(Slice::new(Some(1), None, Some(4))),
            Selection::from(Slice::new(None, None, Some(-6))),
            Selection::from(Slice::new(Some(8), Some(0), Some(-7))),
        ] {
            transport.clear_requests();
            let read = reader.read(&selection).unwrap();
            assert_eq!(read, data.select(&selection).unwrap(), "{selection}");
            let normalised = selection.normalise(&[10]).unwrap();
            assert_eq!(
                transport.requests().len(),
                reader.required_blocks(&normalised).unwrap().len()
            );
        }
    }
}

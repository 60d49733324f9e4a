//! An in-memory transport.

use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use parking_lot::Mutex;

use super::{BlockRequest, QueryParams, Transport, TransportError};
use crate::{
    array_data::ArrayData,
    structure::{ArrayStructure, Structure},
};

/// Identifies an array served under a resource path by its `variable` and `coord` tags.
///
/// The main array of a variable or data array has neither tag.
/// A data variable of a dataset is tagged `variable=<name>`, and a coordinate of a data array is tagged `coord=<name>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayKey {
    variable: Option<String>,
    coord: Option<String>,
}

impl ArrayKey {
    /// The main (untagged) array.
    #[must_use]
    pub fn main() -> Self {
        Self::default()
    }

    /// The array tagged with `variable=<name>`.
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            variable: Some(name.into()),
            coord: None,
        }
    }

    /// The array tagged with `coord=<name>`.
    #[must_use]
    pub fn coord(name: impl Into<String>) -> Self {
        Self {
            variable: None,
            coord: Some(name.into()),
        }
    }

    /// Add a `coord=<name>` tag.
    #[must_use]
    pub fn with_coord(mut self, name: impl Into<String>) -> Self {
        self.coord = Some(name.into());
        self
    }

    fn from_params(params: &QueryParams) -> Self {
        Self {
            variable: params.get("variable").map(str::to_string),
            coord: params.get("coord").map(str::to_string),
        }
    }
}

#[derive(Debug)]
struct StoredArray {
    structure: ArrayStructure,
    data: ArrayData,
}

/// An in-memory transport.
///
/// Serves structures and arrays inserted with [`insert_structure`](MemoryTransport::insert_structure) and [`insert_array`](MemoryTransport::insert_array), and records every request it receives.
/// Block requests are served for any route.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    structures: Mutex<BTreeMap<String, Bytes>>,
    arrays: Mutex<BTreeMap<(String, ArrayKey), Arc<StoredArray>>>,
    block_requests: Mutex<Vec<BlockRequest>>,
    structure_requests: Mutex<Vec<String>>,
}

fn normalise_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

impl MemoryTransport {
    /// Create a new empty memory transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `structure` at `path`.
    ///
    /// # Errors
    /// Returns [`TransportError::Other`] if the structure cannot be serialised.
    pub fn insert_structure<S: Structure>(
        &self,
        path: &str,
        structure: &S,
    ) -> Result<(), TransportError> {
        let json = serde_json::to_vec(structure).map_err(|err| err.to_string())?;
        self.structures
            .lock()
            .insert(normalise_path(path), Bytes::from(json));
        Ok(())
    }

    /// Serve `data` with the block layout of `structure` at `path` under `key`.
    ///
    /// # Errors
    /// Returns [`TransportError::BadRequest`] if `structure` is invalid or does not match the shape or data type of `data`.
    pub fn insert_array(
        &self,
        path: &str,
        key: ArrayKey,
        structure: ArrayStructure,
        data: ArrayData,
    ) -> Result<(), TransportError> {
        structure
            .validate()
            .map_err(|err| TransportError::BadRequest(err.to_string()))?;
        if structure.shape != data.shape() || structure.data_type.data_type() != data.data_type() {
            return Err(TransportError::BadRequest(format!(
                "array of shape {:?} and data type {} does not match structure {structure:?}",
                data.shape(),
                data.data_type()
            )));
        }
        self.arrays.lock().insert(
            (normalise_path(path), key),
            Arc::new(StoredArray { structure, data }),
        );
        Ok(())
    }

    /// The block requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<BlockRequest> {
        self.block_requests.lock().clone()
    }

    /// The paths of the structure requests received so far.
    #[must_use]
    pub fn structure_requests(&self) -> Vec<String> {
        self.structure_requests.lock().clone()
    }

    /// Forget the requests received so far.
    pub fn clear_requests(&self) {
        self.block_requests.lock().clear();
        self.structure_requests.lock().clear();
    }
}

impl Transport for MemoryTransport {
    fn fetch_structure(&self, path: &str, _params: &QueryParams) -> Result<Bytes, TransportError> {
        let path = normalise_path(path);
        self.structure_requests.lock().push(path.clone());
        self.structures
            .lock()
            .get(&path)
            .cloned()
            .ok_or(TransportError::NotFound(path))
    }

    fn fetch_block(&self, request: &BlockRequest) -> Result<Bytes, TransportError> {
        self.block_requests.lock().push(request.clone());
        let key = (
            normalise_path(&request.path),
            ArrayKey::from_params(&request.params),
        );
        let stored = self
            .arrays
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(request.to_string()))?;
        let bad_request = |err: &dyn std::error::Error| TransportError::BadRequest(err.to_string());
        let grid = stored.structure.block_grid().map_err(|err| bad_request(&err))?;
        let subset = grid
            .block_subset(&request.block)
            .map_err(|err| bad_request(&err))?;
        let mut block = stored
            .data
            .extract(&subset)
            .map_err(|err| bad_request(&err))?;
        if let Some(slice) = &request.slice {
            block = block.select(slice).map_err(|err| bad_request(&err))?;
        }
        Ok(Bytes::from(
            block.to_bytes(stored.structure.data_type.endianness()),
        ))
    }
}

//! Lazy readers for remote labeled arrays.
//!
//! Readers mirror the structure tree of a remote node:
//!  - [`BlockArrayReader`]: a raw array, readable by block or by selection,
//!  - [`VariableReader`]: an array with dimension names and attributes, read into a [`Variable`](crate::container::Variable),
//!  - [`DataArrayReader`]: a named variable with coordinates, read into a [`DataArray`](crate::container::DataArray),
//!  - [`DatasetReader`]: data variables sharing coordinates, read into a [`Dataset`](crate::container::Dataset).
//!
//! A reader is created from a [`ReaderContext`] (transport, path, metadata and query parameters) and fetches nothing until it is read.
//! Its structure is fetched on first use and cached for the lifetime of the reader.
//! Sub-readers are built on demand from the structure of their parent, inherit its route, and are tagged with `variable=<name>` or `coord=<name>` query parameters.
//!
//! Every labeled reader is generic over a [`ReadPolicy`]:
//!  - [`Immediate`] (default) fetches data when read,
//!  - [`Deferred`] returns containers of [`DeferredArray`]s which fetch the required blocks on `compute`.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! # use tiled_array_client::client::{ReaderContext, VariableReader};
//! # use tiled_array_client::selection::Slice;
//! # use tiled_array_client::structure::{ArrayStructure, DataType, ElementType, VariableStructure};
//! # use tiled_array_client::transport::{ArrayKey, MemoryTransport, TransportHandle};
//! let transport = Arc::new(MemoryTransport::new());
//! let data = ndarray::ArrayD::<f64>::zeros(ndarray::IxDyn(&[10, 5]));
//! let array = ArrayStructure::new_regular(vec![10, 5], &[4, 5], ElementType::native(DataType::Float64));
//! let structure = VariableStructure::new(vec!["x".into(), "y".into()], array.clone());
//! transport.insert_structure("temp", &structure)?;
//! transport.insert_array("temp", ArrayKey::main(), array, data.into())?;
//!
//! let handle: TransportHandle = transport.clone();
//! let reader: VariableReader = VariableReader::new(ReaderContext::new(handle, "temp"));
//! let variable = reader.read([Slice::Index(3)])?;
//! assert_eq!(variable.dims(), &["y".to_string()]);
//! assert_eq!(transport.requests().len(), 1);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod block_array_reader;
mod client_errors;
mod data_array_reader;
mod dataset_reader;
mod read_policy;
mod variable_reader;

pub use block_array_reader::BlockArrayReader;
pub use client_errors::{ClientError, NodeKind};
pub use data_array_reader::DataArrayReader;
pub use dataset_reader::{DatasetItem, DatasetKey, DatasetReader};
pub use read_policy::{Deferred, DeferredArray, Immediate, ReadPolicy};
pub use variable_reader::VariableReader;

use std::sync::OnceLock;

use crate::{
    structure::{Attributes, InvalidStructureError, Structure},
    transport::{QueryParams, TransportHandle},
};

/// The context of a reader: a transport, a resource path, metadata and query parameters.
///
/// The metadata and query parameters are passed through to sub-readers, and the query parameters are sent with every request.
#[derive(Clone, Debug)]
pub struct ReaderContext {
    transport: TransportHandle,
    path: String,
    metadata: Attributes,
    params: QueryParams,
}

impl ReaderContext {
    /// Create a new reader context for the resource at `path`.
    #[must_use]
    pub fn new(transport: TransportHandle, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
            metadata: Attributes::new(),
            params: QueryParams::new(),
        }
    }

    /// Set the metadata of the resource.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Attributes) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the query parameters sent with every request.
    #[must_use]
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    /// The resource path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The metadata of the resource.
    #[must_use]
    pub fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    /// The query parameters.
    #[must_use]
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// This context with the query parameter `key=value` added, unless `key` is already set.
    pub(crate) fn tagged(&self, key: &str, value: &str) -> Self {
        Self {
            params: self.params.clone().with_default(key, value),
            ..self.clone()
        }
    }
}

/// The state shared by every reader: its context, route, and lazily fetched structure.
#[derive(Clone, Debug)]
struct ReaderBase<S> {
    context: ReaderContext,
    route: String,
    structure: OnceLock<S>,
}

impl<S: Structure> ReaderBase<S> {
    fn new(context: ReaderContext, route: &str) -> Self {
        Self {
            context,
            route: route.to_string(),
            structure: OnceLock::new(),
        }
    }

    fn with_structure(self, structure: S) -> Self {
        Self {
            structure: OnceLock::from(structure),
            ..self
        }
    }

    fn with_route(self, route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..self
        }
    }

    fn structure(&self) -> Result<&S, ClientError> {
        if let Some(structure) = self.structure.get() {
            return Ok(structure);
        }
        log::trace!("fetching structure of {}", self.context.path);
        let bytes = self
            .context
            .transport
            .fetch_structure(&self.context.path, &self.context.params)?;
        let structure: S = serde_json::from_slice(&bytes).map_err(InvalidStructureError::from)?;
        structure.validate()?;
        Ok(self.structure.get_or_init(|| structure))
    }
}

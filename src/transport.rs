//! Transports.
//!
//! A [`Transport`] performs the two kinds of requests the readers issue against a remote resource path:
//!  - a structure request, returning the JSON [structure](crate::structure) of the node at the path, and
//!  - a block request, returning the raw C-order bytes of one block of an array, optionally re-sliced within that block.
//!
//! Included transports:
//!  - [`MemoryTransport`]: an in-memory server, useful for tests and local data,
//!  - [`HttpTransport`] (feature `http`): a blocking HTTP client,
//!  - [`UsageLogTransport`]: an adapter which logs every request issued through another transport.

mod memory_transport;
mod query_params;
mod usage_log;

#[cfg(feature = "http")]
mod http_transport;

pub use memory_transport::{ArrayKey, MemoryTransport};
pub use query_params::QueryParams;
pub use usage_log::UsageLogTransport;

#[cfg(feature = "http")]
pub use http_transport::{HttpTransport, HttpTransportCreateError};

use std::{fmt::Display, sync::Arc};

use bytes::Bytes;
use itertools::Itertools;
use thiserror::Error;

use crate::{selection::Selection, ArrayIndices};

/// A transport.
///
/// Implementations must be safe to call concurrently, block requests of a single read may be issued from multiple threads.
pub trait Transport: Send + Sync + core::fmt::Debug {
    /// Fetch the JSON structure of the node at `path`.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the request fails.
    fn fetch_structure(&self, path: &str, params: &QueryParams) -> Result<Bytes, TransportError>;

    /// Fetch the raw bytes of a block.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the request fails.
    fn fetch_block(&self, request: &BlockRequest) -> Result<Bytes, TransportError>;
}

/// A shared transport handle.
pub type TransportHandle = Arc<dyn Transport>;

/// A request for one block of an array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRequest {
    /// The route template, e.g. `/dataset/block`.
    pub route: String,
    /// The resource path.
    pub path: String,
    /// The query parameters, including any `variable` and `coord` tags.
    pub params: QueryParams,
    /// The block indices.
    pub block: ArrayIndices,
    /// A selection within the block.
    pub slice: Option<Selection>,
}

impl BlockRequest {
    /// The full query of the request: the parameters followed by `block` and, if present, `slice`.
    #[must_use]
    pub fn query(&self) -> QueryParams {
        let mut query = self.params.clone();
        query.insert("block", self.block.iter().join(","));
        if let Some(slice) = &self.slice {
            query.insert("slice", slice.to_string());
        }
        query
    }
}

impl Display for BlockRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}?{}",
            self.route,
            self.path.trim_start_matches('/'),
            self.query()
        )
    }
}

/// A transport error.
#[derive(Clone, Debug, Error)]
pub enum TransportError {
    /// The resource does not exist.
    #[error("not found: {_0}")]
    NotFound(String),
    /// The request was rejected.
    #[error("bad request: {_0}")]
    BadRequest(String),
    /// The service responded with an unexpected status.
    #[error("unexpected status {status}: {message}")]
    Status {
        /// The status code.
        status: u16,
        /// The response message.
        message: String,
    },
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for TransportError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for TransportError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Accept a URI or a file path and return a URI.
///
/// A string without a scheme (e.g. `/data/x` or `data/x`) is interpreted as a file path and becomes `file://localhost/data/x`.
/// A `file` URI always gets the host `localhost` (`file:///data/x` becomes `file://localhost/data/x`).
/// Any other URI is returned unchanged.
#[must_use]
pub fn ensure_uri(uri_or_path: &str) -> String {
    let uri = if has_scheme(uri_or_path) {
        uri_or_path.to_string()
    } else if uri_or_path.starts_with('/') {
        format!("file://localhost{uri_or_path}")
    } else {
        format!("file://localhost/{uri_or_path}")
    };
    match uri.strip_prefix("file://") {
        Some(rest) => {
            let path = rest.find('/').map_or("", |position| &rest[position..]);
            format!("file://localhost{path}")
        }
        None => uri,
    }
}

fn has_scheme(uri: &str) -> bool {
    uri.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    })
}

//! A client library for reading labeled multidimensional arrays from a remote array service.
//!
//! Remote data is organised as a tree of structures: datasets of named data arrays, each a variable with dimension names, attributes and coordinates.
//! Array data is served in rectangular blocks by block endpoints (`/array/block`, `/variable/block`, `/data_array/block`, `/dataset/block`), one request per block.
//!
//! ## Getting Started
//! - Create a [`transport`]: an [`HttpTransport`](transport::HttpTransport) for a remote service (feature `http`) or a [`MemoryTransport`](transport::MemoryTransport) for local data.
//! - Create a reader from the [`client`] module for the node at a path, e.g. a [`DatasetReader`](client::DatasetReader).
//! - Read into a labeled [`container`] with `read`, or defer the fetch with the [`Deferred`](client::Deferred) read policy.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use tiled_array_client::client::{DatasetReader, ReaderContext};
//! use tiled_array_client::transport::{ArrayKey, MemoryTransport, TransportHandle};
//! use tiled_array_client::structure::{
//!     ArrayStructure, DataArrayStructure, DatasetStructure, DataType, ElementType, VariableStructure,
//! };
//!
//! let transport = Arc::new(MemoryTransport::new());
//! let array = ArrayStructure::new_regular(vec![4], &[2], ElementType::native(DataType::Float64));
//! let temp = VariableStructure::new(vec!["x".to_string()], array.clone());
//! let structure = DatasetStructure {
//!     data_vars: [("temp", DataArrayStructure::new(Some("temp".to_string()), temp))]
//!         .into_iter()
//!         .collect(),
//!     ..Default::default()
//! };
//! transport.insert_structure("weather", &structure)?;
//! let data = ndarray::array![280.0, 281.5, 279.0, 283.0].into_dyn();
//! transport.insert_array("weather", ArrayKey::variable("temp"), array, data.into())?;
//!
//! let handle: TransportHandle = transport.clone();
//! let reader: DatasetReader = DatasetReader::new(ReaderContext::new(handle, "weather"));
//! let temp = reader.get_variable("temp")?;
//! assert_eq!(temp.shape(), vec![4]);
//! assert_eq!(transport.requests().len(), 2);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Non-Default
//!  - `http`: a blocking [`HttpTransport`](transport::HttpTransport) built on [`reqwest`](https://docs.rs/reqwest).
//!
//! ## Logging
//! Readers log through the [`log`](https://docs.rs/log) facade:
//!  - `trace`: structure fetches,
//!  - `debug`: every block request.
//!
//! Wrap a transport in a [`UsageLogTransport`](transport::UsageLogTransport) to log every transport call at `info` level.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array_data;
pub mod array_subset;
pub mod block_grid;
pub mod client;
pub mod config;
pub mod container;
pub mod selection;
pub mod structure;
pub mod transport;

/// An array shape. Dimensions may be zero.
pub type ArrayShape = Vec<u64>;

/// Array indices.
pub type ArrayIndices = Vec<u64>;

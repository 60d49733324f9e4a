//! A transport adapter which logs requests.

use std::sync::Arc;

use bytes::Bytes;

use super::{BlockRequest, QueryParams, Transport, TransportError};

/// The usage log transport adapter. Logs every request and its outcome at the `info` level.
///
/// It is intended to aid in debugging and optimising performance by revealing request patterns.
///
/// Reading a dataset through this adapter logs lines like:
/// ```text
/// fetch_structure(ds) -> len=Ok(812)
/// fetch_block(/dataset/block/ds?variable=temp&block=0,0) -> len=Ok(200)
/// fetch_block(/dataset/block/ds?variable=temp&block=1,0) -> len=Ok(200)
/// fetch_block(/dataset/block/ds?variable=x&block=0) -> len=Ok(80)
/// ```
pub struct UsageLogTransport<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: ?Sized> core::fmt::Debug for UsageLogTransport<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "usage log")
    }
}

impl<T: ?Sized> UsageLogTransport<T> {
    /// Create a new usage log transport adapter.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: ?Sized + Transport> Transport for UsageLogTransport<T> {
    fn fetch_structure(&self, path: &str, params: &QueryParams) -> Result<Bytes, TransportError> {
        let result = self.transport.fetch_structure(path, params);
        log::info!(
            "fetch_structure({path}) -> len={:?}",
            result.as_ref().map(Bytes::len)
        );
        result
    }

    fn fetch_block(&self, request: &BlockRequest) -> Result<Bytes, TransportError> {
        let result = self.transport.fetch_block(request);
        log::info!(
            "fetch_block({request}) -> len={:?}",
            result.as_ref().map(Bytes::len)
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, TransportHandle};

    #[test]
    fn usage_log_passthrough() {
        let _ = env_logger::builder().is_test(true).try_init();
        let memory = Arc::new(MemoryTransport::new());
        let handle: TransportHandle = memory.clone();
        let transport = UsageLogTransport::new(handle);
        assert!(transport
            .fetch_structure("missing", &QueryParams::new())
            .is_err());
        assert_eq!(memory.structure_requests(), vec!["missing".to_string()]);
    }
}

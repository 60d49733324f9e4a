//! A blocking HTTP transport.

use bytes::Bytes;
use reqwest::{blocking::Client, StatusCode, Url};
use thiserror::Error;

use super::{ensure_uri, BlockRequest, QueryParams, Transport, TransportError};

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        Self::Other(err.to_string())
    }
}

/// A blocking HTTP transport.
///
/// Block requests are issued as `GET {base}{route}/{path}?{params}&block=i,j[&slice=..]`.
/// Structure requests are issued as `GET {base}{structure_route}/{path}?{params}`, with the structure route defaulting to `/metadata`.
#[derive(Debug)]
pub struct HttpTransport {
    base_url: Url,
    structure_route: String,
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport at a given `base_url`.
    ///
    /// # Errors
    /// Returns a [`HttpTransportCreateError`] if `base_url` is not a valid HTTP URL.
    pub fn new(base_url: &str) -> Result<Self, HttpTransportCreateError> {
        let uri = ensure_uri(base_url);
        let base_url = Url::parse(uri.trim_end_matches('/'))
            .map_err(|_| HttpTransportCreateError::InvalidBaseURL(base_url.into()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(HttpTransportCreateError::InvalidBaseURL(base_url.into()));
        }
        Ok(Self {
            base_url,
            structure_route: "/metadata".to_string(),
            client: Client::new(),
        })
    }

    /// Use `client` for requests.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set the route of structure requests.
    #[must_use]
    pub fn with_structure_route(mut self, structure_route: impl Into<String>) -> Self {
        self.structure_route = structure_route.into();
        self
    }

    /// Maps a route, path and query to a [`Url`].
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    pub fn url(
        &self,
        route: &str,
        path: &str,
        query: &QueryParams,
    ) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.as_str().trim_end_matches('/').to_string();
        url += route;
        let path = path.trim_matches('/');
        if !path.is_empty() {
            url += "/";
            url += path;
        }
        let mut url = Url::parse(&url)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<Bytes, TransportError> {
        let response = self.client.get(url.clone()).send()?;
        match response.status() {
            StatusCode::OK => Ok(response.bytes()?),
            StatusCode::NOT_FOUND => Err(TransportError::NotFound(url.to_string())),
            StatusCode::BAD_REQUEST => Err(TransportError::BadRequest(response.text()?)),
            status => Err(TransportError::Status {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            }),
        }
    }
}

impl Transport for HttpTransport {
    fn fetch_structure(&self, path: &str, params: &QueryParams) -> Result<Bytes, TransportError> {
        let url = self.url(&self.structure_route, path, params)?;
        self.get(url)
    }

    fn fetch_block(&self, request: &BlockRequest) -> Result<Bytes, TransportError> {
        let url = self.url(&request.route, &request.path, &request.query())?;
        self.get(url)
    }
}

/// A HTTP transport creation error.
#[derive(Debug, Error)]
pub enum HttpTransportCreateError {
    /// The URL is not valid.
    #[error("base URL {0} is not valid")]
    InvalidBaseURL(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_transport_urls() {
        let transport = HttpTransport::new("http://localhost:8000/api/v1/").unwrap();
        let request = BlockRequest {
            route: "/data_array/block".to_string(),
            path: "/a/b".to_string(),
            params: QueryParams::from([("coord", "x")]),
            block: vec![0, 1],
            slice: None,
        };
        assert_eq!(
            transport
                .url(&request.route, &request.path, &request.query())
                .unwrap()
                .as_str(),
            "http://localhost:8000/api/v1/data_array/block/a/b?coord=x&block=0%2C1"
        );
        assert_eq!(
            transport
                .url("/metadata", "a", &QueryParams::new())
                .unwrap()
                .as_str(),
            "http://localhost:8000/api/v1/metadata/a"
        );
    }

    #[test]
    fn http_transport_invalid() {
        assert!(HttpTransport::new("/data/x").is_err());
        assert!(HttpTransport::new("http://").is_err());
    }
}

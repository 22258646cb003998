//! Network fetch trait and request/response types

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::error::ProxyError;

/// An outgoing resource request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    /// Origin-relative URL (path and query)
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A bodiless GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }
}

/// A response received from the network
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Network fetch API
///
/// An `Ok` result means the request completed, whatever its status.
/// An `Err` means it could not complete (offline, DNS, connection reset).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<UpstreamResponse, ProxyError>;
}

//! PWA Cache Network Layer
//!
//! This crate provides the network fetch API used by the interceptor,
//! and an HTTP client that fetches from the application's origin.

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::{OriginClient, OriginClientConfig};
pub use error::ProxyError;
pub use fetcher::{FetchRequest, Fetcher, UpstreamResponse};

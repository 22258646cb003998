//! Origin HTTP client

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::error::ProxyError;
use crate::fetcher::{FetchRequest, Fetcher, UpstreamResponse};

/// Headers that describe the client connection rather than the request
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "content-length",
];

/// Origin client configuration
#[derive(Clone, Debug)]
pub struct OriginClientConfig {
    /// Origin of the web application (scheme, host and port only)
    pub url: String,
    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,
}

/// HTTP client fetching resources from the origin
pub struct OriginClient {
    base: Url,
    client: Client,
}

impl OriginClient {
    /// Create a new origin client
    pub fn new(config: OriginClientConfig) -> Result<Self, ProxyError> {
        let base = Url::parse(&config.url)
            .map_err(|e| ProxyError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        // Request URLs are origin-relative, so a base path would be ignored
        if base.path() != "/" || base.query().is_some() {
            return Err(ProxyError::InvalidUrl(format!(
                "{}: origin URL must not have a path or query",
                config.url
            )));
        }

        let mut builder = Client::builder();

        if config.skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        info!("Created origin client for {}", base);

        Ok(Self { base, client })
    }

    /// Resolve an origin-relative URL against the base URL
    pub fn resolve(&self, url: &str) -> Result<Url, ProxyError> {
        let resolved = self
            .base
            .join(url)
            .map_err(|e| ProxyError::InvalidUrl(format!("{}: {}", url, e)))?;

        if resolved.origin() != self.base.origin() {
            return Err(ProxyError::InvalidUrl(format!(
                "{} is outside origin {}",
                url,
                self.base.origin().ascii_serialization()
            )));
        }

        Ok(resolved)
    }

    /// Check if the origin is reachable
    pub async fn ping(&self) -> Result<bool, ProxyError> {
        let response = self.client.head(self.base.clone()).send().await?;
        Ok(!response.status().is_server_error())
    }
}

#[async_trait]
impl Fetcher for OriginClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<UpstreamResponse, ProxyError> {
        let url = self.resolve(&request.url)?;
        debug!("Fetching {} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), url);

        for (name, value) in &request.headers {
            if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
                builder = builder.header(name, value);
            }
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProxyError::Unreachable(e.to_string())
            } else {
                ProxyError::Http(e)
            }
        })?;

        let status = response.status();
        let mut headers = response.headers().clone();
        for name in HOP_BY_HOP_HEADERS {
            headers.remove(*name);
        }
        let body = response.bytes().await?;

        debug!("Origin responded {} ({} bytes)", status, body.len());

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

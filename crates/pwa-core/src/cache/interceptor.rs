//! Cache interceptor implementation

use futures::future::{join_all, try_join_all};
use http::{HeaderMap, StatusCode, header};
use pwa_proxy::{FetchRequest, Fetcher, UpstreamResponse};
use pwa_storage::{CacheStorage, CachedResponse, RequestKey};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::fallback::FallbackKind;
use crate::config::InterceptorConfig;
use crate::error::CoreError;

/// Request headers that ask the origin for a partial or conditional response
const VALIDATOR_HEADERS: [header::HeaderName; 6] = [
    header::RANGE,
    header::IF_RANGE,
    header::IF_NONE_MATCH,
    header::IF_MODIFIED_SINCE,
    header::IF_MATCH,
    header::IF_UNMODIFIED_SINCE,
];

/// How a request was resolved
#[derive(Debug, Clone)]
pub enum Interception {
    /// Served from a cache partition, no network call made
    Cached(CachedResponse),
    /// Fetched from the network (and written to the dynamic partition)
    Network(CachedResponse),
    /// Placeholder substituted for an unavailable resource
    Fallback(CachedResponse),
    /// Fetched from the network without interception (worker not active)
    Passthrough(CachedResponse),
    /// No response could be produced
    Unresolved,
}

impl Interception {
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            Interception::Cached(r)
            | Interception::Network(r)
            | Interception::Fallback(r)
            | Interception::Passthrough(r) => Some(r),
            Interception::Unresolved => None,
        }
    }

    pub fn into_response(self) -> Option<CachedResponse> {
        match self {
            Interception::Cached(r)
            | Interception::Network(r)
            | Interception::Fallback(r)
            | Interception::Passthrough(r) => Some(r),
            Interception::Unresolved => None,
        }
    }

    /// Short outcome label, used in logs, headers and metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            Interception::Cached(_) => "hit",
            Interception::Network(_) => "miss",
            Interception::Fallback(_) => "fallback",
            Interception::Passthrough(_) => "bypass",
            Interception::Unresolved => "unresolved",
        }
    }
}

/// Result of the activation cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Partitions of the current version that were left alone
    pub kept: Vec<String>,
    /// Stale partitions that were deleted
    pub deleted: Vec<String>,
    /// Stale partitions whose deletion failed, with the reason
    pub failed: Vec<(String, String)>,
}

/// Interception counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptorStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub fallback_count: u64,
    pub unresolved_count: u64,
}

/// Cache-first request interceptor
///
/// Stateless apart from counters: lifecycle state is owned by the host.
pub struct CacheInterceptor {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    config: InterceptorConfig,
    stats: RwLock<InterceptorStats>,
}

impl CacheInterceptor {
    /// Create a new cache interceptor
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        config: InterceptorConfig,
    ) -> Self {
        info!(
            "Initializing cache interceptor (static: {}, dynamic: {}, {} assets)",
            config.static_cache,
            config.dynamic_cache,
            config.assets.len()
        );

        Self {
            storage,
            fetcher,
            config,
            stats: RwLock::new(InterceptorStats::default()),
        }
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Get interception counters
    pub async fn stats(&self) -> InterceptorStats {
        self.stats.read().await.clone()
    }

    // ==================== Install ====================

    /// Precache the asset manifest into the static partition.
    ///
    /// All assets are fetched before anything is written; if any of them
    /// fails or returns a non-success status, nothing is stored. A write
    /// failure removes the static partition again.
    pub async fn install(&self) -> Result<usize, CoreError> {
        let urls = self.config.precache_urls();
        info!(
            "Precaching {} assets into {}",
            urls.len(),
            self.config.static_cache
        );

        let fetched = try_join_all(urls.iter().map(|url| self.fetch_asset(url))).await?;

        if let Err(e) = self.store_precached(fetched).await {
            // Drop the partially written partition
            if let Err(cleanup) = self.storage.delete(&self.config.static_cache).await {
                warn!(
                    "Failed to remove partial partition {}: {}",
                    self.config.static_cache, cleanup
                );
            }
            return Err(e);
        }

        info!("Precached {} assets", urls.len());
        Ok(urls.len())
    }

    async fn store_precached(&self, responses: Vec<CachedResponse>) -> Result<(), CoreError> {
        let partition = self.storage.open(&self.config.static_cache).await?;
        for response in responses {
            partition
                .put(RequestKey::get(response.url.clone()), response)
                .await?;
        }
        Ok(())
    }

    async fn fetch_asset(&self, url: &str) -> Result<CachedResponse, CoreError> {
        debug!("Precaching {}", url);

        let response = self
            .fetcher
            .fetch(&FetchRequest::get(url))
            .await
            .map_err(|e| CoreError::Install {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status.is_success() {
            return Err(CoreError::Install {
                url: url.to_string(),
                reason: format!("origin responded {}", response.status),
            });
        }

        Ok(to_cached(url, response))
    }

    // ==================== Activate ====================

    /// Delete every partition that belongs to neither current identifier.
    ///
    /// Deletions run concurrently; a failed deletion is logged and reported
    /// without affecting the others.
    pub async fn activate(&self) -> Result<ActivationReport, CoreError> {
        let names = self.storage.keys().await?;
        let (kept, stale): (Vec<String>, Vec<String>) = names
            .into_iter()
            .partition(|name| self.config.is_current(name));

        let results = join_all(stale.into_iter().map(|name| async move {
            let result = self.storage.delete(&name).await;
            (name, result)
        }))
        .await;

        let mut report = ActivationReport {
            kept,
            ..ActivationReport::default()
        };

        for (name, result) in results {
            match result {
                Ok(true) => {
                    info!("Deleted stale partition {}", name);
                    report.deleted.push(name);
                }
                Ok(false) => debug!("Stale partition {} already gone", name),
                Err(e) => {
                    warn!("Failed to delete stale partition {}: {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    // ==================== Intercept ====================

    /// Resolve a request: cache, then network, then fallback asset.
    ///
    /// Never fails; a request that nothing can satisfy is `Unresolved`.
    pub async fn intercept(&self, request: &FetchRequest) -> Interception {
        let interception = match self.resolve(request).await {
            Ok(interception) => interception,
            Err(e) => {
                debug!("Request {} {} failed: {}", request.method, request.url, e);
                self.fallback_for(&request.url).await
            }
        };

        self.record(&interception).await;
        debug!(
            "{} {} -> {}",
            request.method,
            request.url,
            interception.outcome()
        );
        interception
    }

    /// Fetch a request from the network without consulting or filling the cache
    pub async fn passthrough(&self, request: &FetchRequest) -> Interception {
        match self.fetcher.fetch(request).await {
            Ok(response) => Interception::Passthrough(to_cached(&request.url, response)),
            Err(e) => {
                debug!("Passthrough {} failed: {}", request.url, e);
                Interception::Unresolved
            }
        }
    }

    async fn resolve(&self, request: &FetchRequest) -> Result<Interception, CoreError> {
        let key = RequestKey::new(request.method.clone(), request.url.clone());

        if let Some(cached) = self.storage.lookup(&key).await? {
            return Ok(Interception::Cached(cached));
        }

        // The stored copy must be the full representation
        let upstream = FetchRequest {
            headers: without_validators(&request.headers),
            ..request.clone()
        };
        let response = to_cached(&request.url, self.fetcher.fetch(&upstream).await?);

        if response.status == StatusCode::NOT_FOUND
            && let Some(kind) = FallbackKind::for_url(&request.url)
        {
            return Ok(self.lookup_fallback(kind).await?.map_or(
                Interception::Unresolved,
                Interception::Fallback,
            ));
        }

        if response.status == StatusCode::PARTIAL_CONTENT {
            debug!("Not caching partial response for {}", request.url);
            return Ok(Interception::Network(response));
        }

        // Any other status is written through, a 404 with no fallback included
        let dynamic = self.storage.open(&self.config.dynamic_cache).await?;
        if let Err(e) = dynamic
            .put(RequestKey::get(request.url.clone()), response.clone())
            .await
        {
            warn!("Failed to cache {} in {}: {}", request.url, dynamic.name(), e);
        }

        Ok(Interception::Network(response))
    }

    async fn fallback_for(&self, url: &str) -> Interception {
        let Some(kind) = FallbackKind::for_url(url) else {
            return Interception::Unresolved;
        };

        match self.lookup_fallback(kind).await {
            Ok(Some(response)) => Interception::Fallback(response),
            Ok(None) => Interception::Unresolved,
            Err(e) => {
                warn!("Failed to look up {} fallback: {}", kind, e);
                Interception::Unresolved
            }
        }
    }

    async fn lookup_fallback(&self, kind: FallbackKind) -> Result<Option<CachedResponse>, CoreError> {
        let url = kind.asset_url(&self.config);
        let found = self.storage.lookup(&RequestKey::get(url)).await?;
        if found.is_none() {
            warn!("{} fallback {} is not cached", kind, url);
        }
        Ok(found)
    }

    async fn record(&self, interception: &Interception) {
        let mut stats = self.stats.write().await;
        match interception {
            Interception::Cached(_) => stats.hit_count += 1,
            Interception::Network(_) => stats.miss_count += 1,
            Interception::Fallback(_) => stats.fallback_count += 1,
            Interception::Unresolved => stats.unresolved_count += 1,
            Interception::Passthrough(_) => {}
        }
    }
}

fn without_validators(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in &VALIDATOR_HEADERS {
        headers.remove(name);
    }
    headers
}

fn to_cached(url: &str, response: UpstreamResponse) -> CachedResponse {
    CachedResponse::new(url, response.status, response.headers, response.body)
}

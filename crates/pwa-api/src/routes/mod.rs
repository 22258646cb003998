//! API routes

mod health;
pub mod metrics;
pub mod proxy;
mod status;

use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        .merge(health::routes())
        .merge(status::routes())
        // Everything else goes through the worker host
        .fallback(proxy::intercept)
        .with_state(state)
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024));

    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Request, StatusCode};
    use bytes::Bytes;
    use pwa_core::{CacheInterceptor, InterceptorConfig, WorkerHost};
    use pwa_proxy::{FetchRequest, Fetcher, ProxyError, UpstreamResponse};
    use pwa_storage::MemoryCacheStorage;
    use tower::ServiceExt;

    use super::proxy::CACHE_STATUS_HEADER;

    /// Origin answering 404 for `/missing*`, offline for `/api/*`, 200 otherwise
    struct FakeOrigin;

    #[async_trait]
    impl Fetcher for FakeOrigin {
        async fn fetch(&self, request: &FetchRequest) -> Result<UpstreamResponse, ProxyError> {
            if request.url.starts_with("/api/") {
                return Err(ProxyError::Unreachable(request.url.clone()));
            }
            let status = if request.url.starts_with("/missing") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::OK
            };
            Ok(UpstreamResponse {
                status,
                headers: HeaderMap::new(),
                body: Bytes::from(format!("origin {}", request.url)),
            })
        }
    }

    async fn app(activate: bool) -> Router {
        let interceptor = CacheInterceptor::new(
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(FakeOrigin),
            InterceptorConfig::default(),
        );
        let host = Arc::new(WorkerHost::new(Arc::new(interceptor)));
        host.install().await.unwrap();
        if activate {
            host.activate().await.unwrap();
        }
        create_router(AppState::new(host), None)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Bytes) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let cache = response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, cache, body)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(true).await;
        let (status, _, body) = get(&app, "/_pwa/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_precached_asset_is_a_hit() {
        let app = app(true).await;
        let (status, cache, body) = get(&app, "/index.html").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("hit"));
        assert_eq!(body, Bytes::from("origin /index.html"));
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let app = app(true).await;

        let (_, cache, _) = get(&app, "/styles/site.css?v=2").await;
        assert_eq!(cache.as_deref(), Some("miss"));

        let (_, cache, body) = get(&app, "/styles/site.css?v=2").await;
        assert_eq!(cache.as_deref(), Some("hit"));
        assert_eq!(body, Bytes::from("origin /styles/site.css?v=2"));
    }

    #[tokio::test]
    async fn test_missing_page_serves_fallback() {
        let app = app(true).await;
        let (status, cache, body) = get(&app, "/missing.html").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("fallback"));
        assert_eq!(body, Bytes::from("origin /pages/fallback.html"));
    }

    #[tokio::test]
    async fn test_unresolved_is_bad_gateway() {
        let app = app(true).await;
        let (status, cache, body) = get(&app, "/api/data.json").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(cache.as_deref(), Some("unresolved"));
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_bypass_before_activation() {
        let app = app(false).await;
        let (status, cache, _) = get(&app, "/index.html").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("bypass"));
    }

    #[tokio::test]
    async fn test_status_reports_partitions() {
        let app = app(true).await;
        get(&app, "/app.js").await;

        let (status, _, body) = get(&app, "/_pwa/status").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["static_cache"], "static-pwa-v10");

        let partitions = json["partitions"].as_array().unwrap();
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0]["name"], "static-pwa-v10");
        assert_eq!(partitions[0]["entries"], 5);
        assert_eq!(partitions[1]["name"], "dynamic-pwa-v10");
        assert_eq!(partitions[1]["entries"], 1);
        assert_eq!(json["stats"]["miss_count"], 1);
    }
}

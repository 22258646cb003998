//! Intercepted resource requests

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use pwa_proxy::FetchRequest;
use pwa_storage::CachedResponse;
use tracing::debug;

use crate::state::AppState;

/// Response header naming how the request was resolved
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-pwa-cache");

/// Fallback handler: every request not claimed by another route
pub async fn intercept(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let request = FetchRequest {
        method,
        url,
        headers,
        body,
    };

    let interception = state.host.handle_fetch(&request).await;
    let outcome = interception.outcome();
    debug!("{} {} -> {}", request.method, request.url, outcome);

    metrics::counter!("pwa_cache_requests_total", "outcome" => outcome).increment(1);

    match interception.into_response() {
        Some(cached) => into_http(cached, outcome),
        // Nothing to serve: the page sees a failed request
        None => (
            StatusCode::BAD_GATEWAY,
            [(CACHE_STATUS_HEADER, HeaderValue::from_static(outcome))],
        )
            .into_response(),
    }
}

fn into_http(cached: CachedResponse, outcome: &'static str) -> Response {
    let mut response = (cached.status, cached.body).into_response();
    *response.headers_mut() = cached.headers;
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(outcome));
    response
}

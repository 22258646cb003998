//! Application state

use pwa_core::WorkerHost;
use pwa_storage::CacheStorage;
use std::sync::Arc;

/// Prometheus handle used to render `/metrics`
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub host: Arc<WorkerHost>,
    pub storage: Arc<dyn CacheStorage>,
}

impl AppState {
    pub fn new(host: Arc<WorkerHost>) -> Self {
        let storage = host.interceptor().storage().clone();
        Self { host, storage }
    }
}

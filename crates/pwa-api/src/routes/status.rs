//! Worker status route

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct PartitionInfo {
    pub name: String,
    pub entries: usize,
    pub current: bool,
}

#[derive(Serialize)]
pub struct StatsInfo {
    pub hit_count: u64,
    pub miss_count: u64,
    pub fallback_count: u64,
    pub unresolved_count: u64,
    pub hit_rate: f64,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub state: String,
    pub static_cache: String,
    pub dynamic_cache: String,
    pub partitions: Vec<PartitionInfo>,
    pub stats: StatsInfo,
}

/// GET /_pwa/status
async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let interceptor = state.host.interceptor();
    let config = interceptor.config();

    let mut partitions = Vec::new();
    for name in state.storage.keys().await? {
        let entries = state.storage.open(&name).await?.keys().await?.len();
        partitions.push(PartitionInfo {
            current: config.is_current(&name),
            name,
            entries,
        });
    }

    let stats = interceptor.stats().await;
    let total = stats.hit_count + stats.miss_count;
    let hit_rate = if total > 0 {
        stats.hit_count as f64 / total as f64
    } else {
        0.0
    };

    Ok(Json(StatusResponse {
        state: state.host.state().to_string(),
        static_cache: config.static_cache.clone(),
        dynamic_cache: config.dynamic_cache.clone(),
        partitions,
        stats: StatsInfo {
            hit_count: stats.hit_count,
            miss_count: stats.miss_count,
            fallback_count: stats.fallback_count,
            unresolved_count: stats.unresolved_count,
            hit_rate,
        },
    }))
}

/// Create status routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/_pwa/status", get(status))
}

//! PWA Cache HTTP Adapter
//!
//! This crate provides the Axum-based HTTP layer that hosts the cache
//! interceptor: every request is routed through the worker host, plus
//! health, status and metrics endpoints.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};

//! PWA Cache Core Business Logic
//!
//! This crate provides the cache interceptor: asset precaching on install,
//! stale partition cleanup on activation, and cache-then-network-then-fallback
//! request resolution, plus the lifecycle host that drives it.

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;

pub use cache::{
    ActivationReport, CacheInterceptor, FallbackKind, Interception, InterceptorStats,
};
pub use config::InterceptorConfig;
pub use error::CoreError;
pub use lifecycle::{LifecycleState, WorkerHost};

//! Core error types

use thiserror::Error;

use crate::lifecycle::LifecycleState;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] pwa_storage::StorageError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] pwa_proxy::ProxyError),

    #[error("Failed to precache {url}: {reason}")]
    Install { url: String, reason: String },

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

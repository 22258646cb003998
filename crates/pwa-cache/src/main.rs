//! PWA Cache - cache-first offline proxy for a web application

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;
use pwa_api::{AppState, create_router};
use pwa_core::{CacheInterceptor, WorkerHost};
use pwa_proxy::{OriginClient, OriginClientConfig};
use pwa_storage::{CacheStorage, LocalCacheStorage, MemoryCacheStorage};

/// PWA Cache - serves an origin cache-first, with offline fallbacks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "PWA_CACHE_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "PWA_CACHE_PORT")]
    port: Option<u16>,

    /// Origin URL
    #[arg(long, env = "PWA_CACHE_ORIGIN")]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(origin) = args.origin {
        config.origin.url = origin;
    }

    init_logging(&config.logging.level, &config.logging.format);

    info!("Starting PWA Cache v{}", env!("CARGO_PKG_VERSION"));

    let storage = create_storage(&config).await?;

    let origin = Arc::new(OriginClient::new(OriginClientConfig {
        url: config.origin.url.clone(),
        skip_tls_verify: config.origin.skip_tls_verify,
    })?);

    match origin.ping().await {
        Ok(true) => info!("Origin {} is reachable", config.origin.url),
        Ok(false) => warn!("Origin {} reported a server error", config.origin.url),
        Err(e) => warn!("Origin {} is unreachable: {}", config.origin.url, e),
    }

    let interceptor_config = config.cache.interceptor_config();
    interceptor_config.validate()?;

    let interceptor = Arc::new(CacheInterceptor::new(
        storage,
        origin,
        interceptor_config,
    ));
    let host = Arc::new(WorkerHost::new(interceptor));

    // Install must complete before any traffic is routed to the worker
    let precached = host
        .install()
        .await
        .context("Install failed, required assets could not be precached")?;
    info!("Installed ({} assets precached)", precached);

    match host.activate().await {
        Ok(report) => info!(
            "Activated ({} stale partitions deleted, {} failed)",
            report.deleted.len(),
            report.failed.len()
        ),
        Err(e) => warn!("Activated without cleanup: {}", e),
    }

    let metrics_handle = if config.server.metrics {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install metrics recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    let app = create_router(AppState::new(host), metrics_handle)
        .layer(TraceLayer::new_for_http());

    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);
    info!("Origin: {}", config.origin.url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the configured cache storage backend
async fn create_storage(config: &Config) -> Result<Arc<dyn CacheStorage>> {
    match config.storage.backend.as_str() {
        "local" => {
            let storage = LocalCacheStorage::new(&config.storage.local.path)
                .await
                .with_context(|| {
                    format!("Failed to open cache storage at {}", config.storage.local.path)
                })?;
            Ok(Arc::new(storage))
        }
        "memory" => {
            info!("Using in-memory cache storage, partitions will not survive restarts");
            Ok(Arc::new(MemoryCacheStorage::new()))
        }
        other => bail!("Unknown storage backend: {}", other),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

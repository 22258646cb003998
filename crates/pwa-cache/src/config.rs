//! Configuration loading and management

use anyhow::{Context, Result};
use pwa_core::InterceptorConfig;
use pwa_core::config::{
    DEFAULT_ASSETS, DEFAULT_DYNAMIC_PREFIX, DEFAULT_HTML_FALLBACK_URL,
    DEFAULT_IMAGE_FALLBACK_URL, DEFAULT_STATIC_PREFIX, DEFAULT_VERSION,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            metrics: true,
        }
    }
}

/// Origin (web application) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    #[serde(default = "default_origin_url")]
    pub url: String,
    #[serde(default)]
    pub skip_tls_verify: bool,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: default_origin_url(),
            skip_tls_verify: false,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Version embedded in partition names; bumping it retires old partitions
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,
    #[serde(default = "default_dynamic_prefix")]
    pub dynamic_prefix: String,
    /// Asset manifest precached on install
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    #[serde(default = "default_html_fallback")]
    pub html_fallback: String,
    #[serde(default = "default_image_fallback")]
    pub image_fallback: String,
    #[serde(default = "default_true")]
    pub precache_fallbacks: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            static_prefix: default_static_prefix(),
            dynamic_prefix: default_dynamic_prefix(),
            assets: default_assets(),
            html_fallback: default_html_fallback(),
            image_fallback: default_image_fallback(),
            precache_fallbacks: true,
        }
    }
}

impl CacheConfig {
    /// Build the interceptor configuration
    pub fn interceptor_config(&self) -> InterceptorConfig {
        InterceptorConfig {
            html_fallback: self.html_fallback.clone(),
            image_fallback: self.image_fallback.clone(),
            precache_fallbacks: self.precache_fallbacks,
            ..InterceptorConfig::versioned(&self.static_prefix, &self.dynamic_prefix, &self.version)
        }
        .with_assets(self.assets.iter().cloned())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "memory" or "local"
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub local: LocalStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            local: LocalStorageConfig::default(),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    #[serde(default = "default_local_path")]
    pub path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            path: default_local_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_true() -> bool {
    true
}

fn default_origin_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_static_prefix() -> String {
    DEFAULT_STATIC_PREFIX.to_string()
}

fn default_dynamic_prefix() -> String {
    DEFAULT_DYNAMIC_PREFIX.to_string()
}

fn default_assets() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_html_fallback() -> String {
    DEFAULT_HTML_FALLBACK_URL.to_string()
}

fn default_image_fallback() -> String {
    DEFAULT_IMAGE_FALLBACK_URL.to_string()
}

fn default_backend() -> String {
    "local".to_string()
}

fn default_local_path() -> String {
    "./data/cache".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            origin: OriginConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }
}

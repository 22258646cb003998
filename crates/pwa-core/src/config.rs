//! Interceptor configuration

use pwa_storage::validate_partition_name;

use crate::error::CoreError;

/// Default prefix of the static partition name
pub const DEFAULT_STATIC_PREFIX: &str = "static-pwa";

/// Default prefix of the dynamic partition name
pub const DEFAULT_DYNAMIC_PREFIX: &str = "dynamic-pwa";

/// Default cache version
pub const DEFAULT_VERSION: &str = "10";

/// Assets precached into the static partition by default
pub const DEFAULT_ASSETS: &[&str] = &["/", "/index.html", "/favicon.ico"];

/// Placeholder served for HTML requests that cannot be satisfied
pub const DEFAULT_HTML_FALLBACK_URL: &str = "/pages/fallback.html";

/// Placeholder served for image requests that cannot be satisfied
pub const DEFAULT_IMAGE_FALLBACK_URL: &str = "/images/noimage-250.png";

/// Immutable configuration injected into the interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorConfig {
    /// Current static partition name
    pub static_cache: String,
    /// Current dynamic partition name
    pub dynamic_cache: String,
    /// Asset manifest, precached on install
    pub assets: Vec<String>,
    pub html_fallback: String,
    pub image_fallback: String,
    /// Precache the fallback assets alongside the manifest
    pub precache_fallbacks: bool,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self::versioned(DEFAULT_STATIC_PREFIX, DEFAULT_DYNAMIC_PREFIX, DEFAULT_VERSION)
    }
}

impl InterceptorConfig {
    /// Build a configuration whose partition names embed `version`,
    /// e.g. `static-pwa` + `10` gives `static-pwa-v10`
    pub fn versioned(static_prefix: &str, dynamic_prefix: &str, version: &str) -> Self {
        Self {
            static_cache: partition_name(static_prefix, version),
            dynamic_cache: partition_name(dynamic_prefix, version),
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
            html_fallback: DEFAULT_HTML_FALLBACK_URL.to_string(),
            image_fallback: DEFAULT_IMAGE_FALLBACK_URL.to_string(),
            precache_fallbacks: true,
        }
    }

    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a partition belongs to the current version
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_cache || name == self.dynamic_cache
    }

    /// URLs written to the static partition on install, in order, without duplicates
    pub fn precache_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::with_capacity(self.assets.len() + 2);
        let fallbacks = [&self.html_fallback, &self.image_fallback];
        let extra = fallbacks
            .into_iter()
            .filter(|_| self.precache_fallbacks);

        for url in self.assets.iter().chain(extra) {
            if !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        urls
    }

    /// Validate partition names and URLs
    pub fn validate(&self) -> Result<(), CoreError> {
        for name in [&self.static_cache, &self.dynamic_cache] {
            validate_partition_name(name)
                .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        }

        if self.static_cache == self.dynamic_cache {
            return Err(CoreError::InvalidConfig(format!(
                "static and dynamic partitions share the name {}",
                self.static_cache
            )));
        }

        let urls = self
            .assets
            .iter()
            .chain([&self.html_fallback, &self.image_fallback]);
        for url in urls {
            if !url.starts_with('/') {
                return Err(CoreError::InvalidConfig(format!(
                    "URL must be origin-relative: {}",
                    url
                )));
            }
        }

        Ok(())
    }
}

fn partition_name(prefix: &str, version: &str) -> String {
    format!("{}-v{}", prefix, version)
}

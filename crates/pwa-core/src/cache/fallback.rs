//! Fallback asset selection

use std::fmt;

use crate::config::InterceptorConfig;

/// Kind of placeholder content substituted for an unavailable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// HTML documents (URL contains `.html`)
    Html,
    /// Images (URL contains `.png` or `.jpg`)
    Image,
}

impl FallbackKind {
    /// Pick a fallback by substring match on the request URL.
    /// HTML wins when a URL matches both.
    pub fn for_url(url: &str) -> Option<Self> {
        if url.contains(".html") {
            Some(FallbackKind::Html)
        } else if url.contains(".png") || url.contains(".jpg") {
            Some(FallbackKind::Image)
        } else {
            None
        }
    }

    /// URL of the fallback asset for this kind
    pub fn asset_url<'a>(&self, config: &'a InterceptorConfig) -> &'a str {
        match self {
            FallbackKind::Html => &config.html_fallback,
            FallbackKind::Image => &config.image_fallback,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackKind::Html => "html",
            FallbackKind::Image => "image",
        }
    }
}

impl fmt::Display for FallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_urls() {
        assert_eq!(FallbackKind::for_url("/missing.html"), Some(FallbackKind::Html));
        assert_eq!(FallbackKind::for_url("/pages/about.html?x=1"), Some(FallbackKind::Html));
    }

    #[test]
    fn test_image_urls() {
        assert_eq!(FallbackKind::for_url("/missing.png"), Some(FallbackKind::Image));
        assert_eq!(FallbackKind::for_url("/photos/cat.jpg"), Some(FallbackKind::Image));
        // Substring match, not extension match
        assert_eq!(FallbackKind::for_url("/img.png.bak"), Some(FallbackKind::Image));
    }

    #[test]
    fn test_no_fallback() {
        assert_eq!(FallbackKind::for_url("/api/data.json"), None);
        assert_eq!(FallbackKind::for_url("/icon.svg"), None);
        assert_eq!(FallbackKind::for_url("/photo.jpeg"), None);
    }

    #[test]
    fn test_html_takes_precedence() {
        assert_eq!(FallbackKind::for_url("/gallery.html?img=a.png"), Some(FallbackKind::Html));
    }

    #[test]
    fn test_asset_url() {
        let config = InterceptorConfig::default();
        assert_eq!(FallbackKind::Html.asset_url(&config), "/pages/fallback.html");
        assert_eq!(FallbackKind::Image.asset_url(&config), "/images/noimage-250.png");
    }
}

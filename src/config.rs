//! Process configuration
//!
//! Built once in `main` and handed to each component by value. Nothing in
//! here is mutated after construction.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;

use crate::photos::ApiError;

/// Default per-request timeout for collaborator calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default output resolution (a 1080p frame)
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Header carrying the photo server API key
const API_KEY_HEADER: &str = "x-api-key";

/// Connection settings for one collaborator
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// API key, sent on every request when set
    pub api_key: Option<String>,
    /// Upper bound for a single request
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, api_key: Option<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            request_timeout,
        }
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Build an HTTP client carrying the credential and timeout
    pub fn http_client(&self) -> Result<Client, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| ApiError::Transport(format!("invalid API key header: {}", e)))?;
            headers.insert(API_KEY_HEADER, value);
        }

        Client::builder()
            .timeout(self.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {}", e)))
    }
}

/// Cache synchronizer settings
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory holding `{id}.jpg` files
    pub cache_dir: PathBuf,
    /// Storage resolution requested for each image
    pub image_width: u32,
    pub image_height: u32,
    /// Pause between reconciliation ticks
    pub refresh_interval: Duration,
    /// Path of the id listing endpoint
    pub list_path: String,
}

impl SyncConfig {
    /// Default cache location: `<platform cache dir>/photoframe`
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("photoframe")
    }
}

/// Transform proxy settings
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub listen: SocketAddr,
    /// Album whose image assets are served
    pub album_id: String,
    /// Resolution used when a request omits `w` or `h`
    pub default_width: u32,
    pub default_height: u32,
    /// Caption font family list, in SVG `font-family` syntax
    pub font_family: String,
    /// Extra directory scanned for font files
    pub font_dir: Option<PathBuf>,
    pub jpeg_quality: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let config = ClientConfig::new("http://photos.local:2283/api/", None, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.base_url, "http://photos.local:2283/api");
        assert_eq!(config.url("/assets/x"), "http://photos.local:2283/api/assets/x");
        assert_eq!(config.url("images"), "http://photos.local:2283/api/images");
    }

    #[test]
    fn test_empty_api_key_is_absent() {
        let config = ClientConfig::new("http://x", Some(String::new()), DEFAULT_REQUEST_TIMEOUT);
        assert!(config.api_key.is_none());
        assert!(config.http_client().is_ok());
    }
}

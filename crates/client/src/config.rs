//! Client configuration loaded from environment variables.

use std::time::Duration;

/// Client configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `STOREFRONT_API_URL`: API base URL (default: `"http://127.0.0.1:3000"`)
/// - `STOREFRONT_CATALOG_MAX_RETRIES`: retries after a 429 (default: `3`)
/// - `STOREFRONT_CATALOG_BACKOFF_MS`: base backoff delay (default: `1000`)
/// - `STOREFRONT_CART_GRACE_MS`: wait before the reconciling cart read (default: `100`)
/// - `STOREFRONT_REQUEST_TIMEOUT_SECS`: per-request timeout (default: `30`)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub catalog_max_retries: u32,
    pub catalog_backoff_base: Duration,
    pub cart_grace: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("STOREFRONT_API_URL").unwrap_or(defaults.base_url),
            catalog_max_retries: env_parse("STOREFRONT_CATALOG_MAX_RETRIES")
                .unwrap_or(defaults.catalog_max_retries),
            catalog_backoff_base: env_parse("STOREFRONT_CATALOG_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.catalog_backoff_base),
            cart_grace: env_parse("STOREFRONT_CART_GRACE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cart_grace),
            request_timeout: env_parse("STOREFRONT_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Returns a copy pointing at `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds an absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            catalog_max_retries: 3,
            catalog_backoff_base: Duration::from_millis(1000),
            cart_grace: Duration::from_millis(100),
            request_timeout: Duration::from_secs(30),
        }
    }
}

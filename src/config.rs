use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::ValidationError;
use crate::offline_store::DEFAULT_CACHE_KEY;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8281/api";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const MAX_URL_LENGTH: usize = 2048;

/// Settings supplied by the shell on `AppStarted`. Missing fields take the
/// defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub cache_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn api_base(&self) -> Result<ApiBase, ValidationError> {
        ApiBase::new(&self.api_base_url)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.api_base()?;
        if self.cache_key.trim().is_empty() {
            return Err(ValidationError::EmptyField("cacheKey"));
        }
        Ok(())
    }
}

/// Validated backend root, stored without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiBase {
    url: String,
}

impl ApiBase {
    pub fn new(url: &str) -> Result<Self, ValidationError> {
        let trimmed = url.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_URL_LENGTH {
            return Err(ValidationError::InvalidUrl(truncate(trimmed)));
        }
        let parsed = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl(format!("{}: {e}", truncate(trimmed))))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidUrl(format!(
                "{}: only http and https are allowed",
                truncate(trimmed)
            )));
        }
        if parsed.host_str().is_none() {
            return Err(ValidationError::InvalidUrl(format!("{}: missing host", truncate(trimmed))));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(ValidationError::InvalidUrl(
                "credentials in URL are not allowed".to_string(),
            ));
        }
        Ok(Self {
            url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// `path` must start with `/`.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }
}

fn truncate(url: &str) -> String {
    if url.len() <= 100 {
        url.to_string()
    } else {
        let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &url[..cut])
    }
}

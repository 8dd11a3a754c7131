use url::Url;

use crate::error::CheckError;
use crate::settings::OfflineConfig;

/// Host of the Gemini API. Requests to it always go to the network.
pub const GEMINI_HOST: &str = "generativelanguage.googleapis.com";

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Not handled by the cache at all.
    Passthrough,
    /// Always fetched from the network, never stored.
    NetworkOnly,
    /// Served from the cache, falling back to the network on a miss.
    CacheFirst,
}

/// Which requests are cached, and under which cache version.
#[derive(Debug, Clone)]
pub struct OfflinePolicy {
    pub cache_name: String,
    pub origin: Option<Url>,
    assets: Vec<String>,
    network_only_hosts: Vec<String>,
}

impl OfflinePolicy {
    pub fn from_config(config: &OfflineConfig) -> Result<Self, CheckError> {
        if config.cache_name.trim().is_empty() {
            return Err(CheckError::Config("offline.cache_name is empty".to_string()));
        }

        let origin = match config.origin.as_deref().map(str::trim) {
            Some(origin) if !origin.is_empty() => Some(Url::parse(origin).map_err(|e| {
                CheckError::Config(format!("offline.origin '{}' is not a URL: {}", origin, e))
            })?),
            _ => None,
        };

        let mut network_only_hosts: Vec<String> = config
            .network_only_hosts
            .iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        if !network_only_hosts.iter().any(|h| h == GEMINI_HOST) {
            network_only_hosts.push(GEMINI_HOST.to_string());
        }

        Ok(Self {
            cache_name: config.cache_name.trim().to_string(),
            origin,
            assets: config.assets.iter().map(|a| normalize_path(a)).collect(),
            network_only_hosts,
        })
    }

    /// Allow-listed asset paths, each starting with `/`.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Pick the strategy for one request.
    pub fn route(&self, method: &str, url: &Url) -> FetchStrategy {
        if !method.eq_ignore_ascii_case("GET") {
            return FetchStrategy::Passthrough;
        }
        if let Some(host) = url.host_str() {
            if self
                .network_only_hosts
                .iter()
                .any(|h| h.eq_ignore_ascii_case(host))
            {
                return FetchStrategy::NetworkOnly;
            }
        }
        if self.is_asset(url.path()) {
            FetchStrategy::CacheFirst
        } else {
            FetchStrategy::Passthrough
        }
    }

    pub fn is_asset(&self, path: &str) -> bool {
        self.assets.iter().any(|a| a == path)
    }

    /// Absolute URL of an asset under the configured origin.
    pub fn asset_url(&self, path: &str) -> Option<Url> {
        self.origin.as_ref().and_then(|o| o.join(path).ok())
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

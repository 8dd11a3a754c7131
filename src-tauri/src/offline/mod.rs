//! Offline asset cache for the hosted web build.
//!
//! Allow-listed assets are fetched from the configured origin into a
//! versioned SQLite cache and served cache-first afterwards through the
//! `offline://` URI scheme. API traffic is never cached. Bumping `offline.cache_name` invalidates every older copy on
//! the next activation.

pub mod policy;
pub mod store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use url::Url;

pub use policy::{FetchStrategy, OfflinePolicy};
pub use store::{AssetStore, CachedAsset};

/// File name of the asset database in the app data directory.
pub const ASSET_DB_FILE: &str = "offline_assets.db";

/// URI scheme the webview uses to load the hosted build through the cache.
pub const URI_SCHEME: &str = "offline";

const FETCH_TIMEOUT_SECS: u64 = 30;

/// A response served by [`fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub from_cache: bool,
}

/// Outcome of an install + activate pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub cache_name: String,
    pub cached: Vec<String>,
    pub skipped: Vec<String>,
    pub removed_caches: Vec<String>,
    /// Assets held under `cache_name` after activation.
    pub total_cached: usize,
}

fn build_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

async fn fetch_network(client: &reqwest::Client, url: &Url) -> Result<FetchedAsset, String> {
    let response = client
        .get(url.clone())
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(|e| format!("Network fetch failed for {}: {}", url.path(), e.without_url()))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let body = response
        .bytes()
        .await
        .map_err(|e| format!("Failed to read body of {}: {}", url.path(), e.without_url()))?
        .to_vec();

    Ok(FetchedAsset {
        status,
        content_type,
        body,
        from_cache: false,
    })
}

async fn store_asset(db_path: PathBuf, cache_name: String, path: String, asset: FetchedAsset) -> Result<(), String> {
    tokio::task::spawn_blocking(move || {
        let store = AssetStore::new(&db_path)?;
        store.put(&cache_name, &path, asset.content_type.as_deref(), &asset.body)
    })
    .await
    .map_err(|e| format!("Asset store task panicked: {}", e))?
}

/// Fetch every allow-listed asset from the origin into the current cache.
/// An asset that fails or does not answer 200 is logged and skipped.
pub async fn install(policy: &OfflinePolicy, db_path: &Path) -> Result<RefreshReport, String> {
    let origin = policy
        .origin
        .as_ref()
        .ok_or_else(|| "No offline origin configured".to_string())?;
    info!(
        "Installing {} offline asset(s) from {} into '{}'",
        policy.assets().len(),
        origin,
        policy.cache_name
    );

    let client = build_client()?;
    let mut report = RefreshReport {
        cache_name: policy.cache_name.clone(),
        ..Default::default()
    };

    for path in policy.assets() {
        let Some(url) = policy.asset_url(path) else {
            warn!("Skipping asset with unusable path: {}", path);
            report.skipped.push(path.clone());
            continue;
        };
        match fetch_network(&client, &url).await {
            Ok(asset) if asset.status == 200 => {
                store_asset(
                    db_path.to_path_buf(),
                    policy.cache_name.clone(),
                    path.clone(),
                    asset,
                )
                .await?;
                report.cached.push(path.clone());
            }
            Ok(asset) => {
                warn!("Failed to cache {}: status {}", path, asset.status);
                report.skipped.push(path.clone());
            }
            Err(e) => {
                warn!("Failed to cache {}: {}", path, e);
                report.skipped.push(path.clone());
            }
        }
    }

    info!(
        "Offline install complete: {} cached, {} skipped",
        report.cached.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Delete every cache other than the current one. Returns the removed names.
pub async fn activate(policy: &OfflinePolicy, db_path: &Path) -> Result<Vec<String>, String> {
    let db_path = db_path.to_path_buf();
    let keep = policy.cache_name.clone();
    tokio::task::spawn_blocking(move || {
        let store = AssetStore::new(&db_path)?;
        store.purge_except(&keep)
    })
    .await
    .map_err(|e| format!("Asset store task panicked: {}", e))?
}

/// Install then activate.
pub async fn refresh(policy: &OfflinePolicy, db_path: &Path) -> Result<RefreshReport, String> {
    let mut report = install(policy, db_path).await?;
    report.removed_caches = activate(policy, db_path).await?;

    let count_db = db_path.to_path_buf();
    let cache_name = policy.cache_name.clone();
    report.total_cached = tokio::task::spawn_blocking(move || {
        let store = AssetStore::new(&count_db)?;
        store.count(&cache_name)
    })
    .await
    .map_err(|e| format!("Asset store task panicked: {}", e))??;
    Ok(report)
}

/// Serve one request according to the policy.
pub async fn fetch(
    policy: &OfflinePolicy,
    db_path: &Path,
    method: &str,
    url: &Url,
) -> Result<FetchedAsset, String> {
    let strategy = policy.route(method, url);
    if strategy != FetchStrategy::CacheFirst {
        let client = build_client()?;
        return fetch_network(&client, url).await;
    }

    let path = url.path().to_string();
    let lookup_db = db_path.to_path_buf();
    let cache_name = policy.cache_name.clone();
    let lookup_path = path.clone();
    let cached = tokio::task::spawn_blocking(move || {
        let store = AssetStore::new(&lookup_db)?;
        store.get(&cache_name, &lookup_path)
    })
    .await
    .map_err(|e| format!("Asset store task panicked: {}", e))??;

    if let Some(asset) = cached {
        return Ok(FetchedAsset {
            status: 200,
            content_type: asset.content_type,
            body: asset.body,
            from_cache: true,
        });
    }

    let client = build_client()?;
    let fetched = fetch_network(&client, url).await?;
    if fetched.status == 200 {
        store_asset(
            db_path.to_path_buf(),
            policy.cache_name.clone(),
            path,
            fetched.clone(),
        )
        .await?;
    }
    Ok(fetched)
}

/// Serve a request made against [`URI_SCHEME`]. `path` is the path and query
/// of the request, resolved against the configured origin.
pub async fn serve(
    policy: &OfflinePolicy,
    db_path: &Path,
    method: &str,
    path: &str,
) -> Result<FetchedAsset, String> {
    let url = policy
        .asset_url(path)
        .ok_or_else(|| "No offline origin configured".to_string())?;
    fetch(policy, db_path, method, &url).await
}

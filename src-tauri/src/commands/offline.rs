use std::path::PathBuf;

use tauri::http::{header::CONTENT_TYPE, Response, StatusCode};
use tauri::{AppHandle, Manager, State};
use tracing::{info, warn};

use crate::offline::{self, FetchedAsset, OfflinePolicy, RefreshReport, ASSET_DB_FILE};
use crate::settings::CheckerConfig;

/// Path of the offline asset database in the app data directory.
pub fn asset_db_path(app: &AppHandle) -> Result<PathBuf, String> {
    let data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| format!("Failed to resolve app data directory: {}", e))?;
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| format!("Failed to create app data directory: {}", e))?;
    Ok(data_dir.join(ASSET_DB_FILE))
}

/// Re-download the allow-listed assets and drop older cache versions.
#[tauri::command]
pub async fn refresh_offline_cache(
    app: AppHandle,
    config: State<'_, CheckerConfig>,
) -> Result<RefreshReport, String> {
    let policy = OfflinePolicy::from_config(&config.offline).map_err(String::from)?;
    let db_path = asset_db_path(&app)?;
    info!("refresh_offline_cache into {:?}", db_path);
    offline::refresh(&policy, &db_path).await
}

/// Answer one `offline://` request from the asset cache.
pub async fn serve_offline_request(app: AppHandle, method: String, path: String) -> Response<Vec<u8>> {
    let result = async {
        let offline_config = app
            .try_state::<CheckerConfig>()
            .map(|config| config.offline.clone())
            .ok_or_else(|| "Configuration is not loaded yet".to_string())?;
        let policy = OfflinePolicy::from_config(&offline_config).map_err(String::from)?;
        let db_path = asset_db_path(&app)?;
        offline::serve(&policy, &db_path, &method, &path).await
    }
    .await;
    asset_response(&path, result)
}

/// Convert a served asset into a webview response. Failures become a 502
/// with the reason as plain text.
pub fn asset_response(path: &str, result: Result<FetchedAsset, String>) -> Response<Vec<u8>> {
    let (status, content_type, body) = match result {
        Ok(asset) => (asset.status, asset.content_type, asset.body),
        Err(e) => {
            warn!("Offline request for {} failed: {}", path, e);
            (502, Some("text/plain".to_string()), e.into_bytes())
        }
    };

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap_or_else(|e| {
        warn!("Could not build response for {}: {}", path, e);
        let mut response = Response::new(Vec::new());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

pub mod checker;
mod commands;
pub mod error;
pub mod offline;
pub mod settings;

pub use checker::{CheckGate, CheckRequest, CheckResponse};
pub use error::CheckError;
pub use settings::CheckerConfig;

use tauri::Manager;

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .plugin(tauri_plugin_clipboard_manager::init())
        .manage(CheckGate::new())
        .register_asynchronous_uri_scheme_protocol(offline::URI_SCHEME, |ctx, request, responder| {
            let app = ctx.app_handle().clone();
            let method = request.method().to_string();
            let path = request
                .uri()
                .path_and_query()
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| "/".to_string());
            tauri::async_runtime::spawn(async move {
                responder.respond(commands::offline::serve_offline_request(app, method, path).await);
            });
        })
        .invoke_handler(tauri::generate_handler![
            commands::check::check_grammar,
            commands::check::analyze_input,
            commands::check::get_app_config,
            commands::keychain::set_api_key,
            commands::keychain::get_api_key,
            commands::keychain::delete_api_key,
            commands::config::get_preference,
            commands::config::set_preference,
            commands::config::delete_preference,
            commands::config::get_model_selection,
            commands::clipboard::copy_text,
            commands::offline::refresh_offline_cache,
        ])
        .setup(|app| {
            let config_dir = app.path().app_config_dir().ok();
            let config = settings::effective_config(config_dir.as_deref());
            tracing::info!(
                "Using model '{}' via {:?} transport, explain contract {:?}",
                config.model.default,
                config.endpoint.transport,
                config.explain.contract
            );

            // Warm the offline cache in the background when an origin is set
            if config.offline.origin.is_some() {
                match offline::OfflinePolicy::from_config(&config.offline) {
                    Ok(policy) => {
                        let handle = app.handle().clone();
                        tauri::async_runtime::spawn(async move {
                            let db_path = match commands::offline::asset_db_path(&handle) {
                                Ok(path) => path,
                                Err(e) => {
                                    tracing::warn!("Offline cache disabled: {}", e);
                                    return;
                                }
                            };
                            if let Err(e) = offline::refresh(&policy, &db_path).await {
                                tracing::warn!("Offline cache refresh failed: {}", e);
                            }
                        });
                    }
                    Err(e) => tracing::warn!("Offline cache disabled: {}", e),
                }
            }

            app.manage(config);
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

use serde::Serialize;
use tauri::{AppHandle, State};
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::settings::{
    CheckerConfig, PREFERENCES_STORE, PREF_MODEL, PREF_REMEMBER_MODEL, PREF_THEME,
};

const KNOWN_KEYS: [&str; 3] = [PREF_MODEL, PREF_REMEMBER_MODEL, PREF_THEME];

fn check_key(key: &str) -> Result<(), String> {
    if KNOWN_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(format!("Unknown preference: '{}'", key))
    }
}

#[tauri::command]
pub fn get_preference(app: AppHandle, key: &str) -> Result<Option<String>, String> {
    check_key(key)?;
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    let value = store.get(key).and_then(|v| v.as_str().map(|s| s.to_string()));
    Ok(value)
}

#[tauri::command]
pub fn set_preference(app: AppHandle, key: &str, value: &str) -> Result<(), String> {
    check_key(key)?;
    info!("Setting preference: {} = {}", key, value);
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    store.set(key, serde_json::json!(value));
    store.save().map_err(|e| {
        warn!("Failed to save store: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub fn delete_preference(app: AppHandle, key: &str) -> Result<(), String> {
    check_key(key)?;
    info!("Deleting preference: {}", key);
    let store = app.store(PREFERENCES_STORE).map_err(|e| e.to_string())?;
    store.delete(key);
    store.save().map_err(|e| {
        warn!("Failed to save store: {}", e);
        e.to_string()
    })
}

/// Model to preselect, and whether the user chose to remember it.
#[derive(Debug, Serialize)]
pub struct ModelSelection {
    pub model: String,
    pub remembered: bool,
}

/// Resolve the saved model against the configured list.
/// A saved model that is no longer offered is removed from the store.
#[tauri::command]
pub fn get_model_selection(
    app: AppHandle,
    config: State<'_, CheckerConfig>,
) -> Result<ModelSelection, String> {
    let store = app.store(PREFERENCES_STORE).map_err(|e| e.to_string())?;
    let remembered = store
        .get(PREF_REMEMBER_MODEL)
        .and_then(|v| v.as_str().map(|s| s == "true"))
        .unwrap_or(false);
    let saved = store
        .get(PREF_MODEL)
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .filter(|_| remembered);

    let choice = config.resolve_model(saved.as_deref());
    if choice.discard_saved {
        store.delete(PREF_MODEL);
        store.save().map_err(|e| e.to_string())?;
    }

    Ok(ModelSelection {
        model: choice.model,
        remembered,
    })
}

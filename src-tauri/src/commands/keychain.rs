use keyring::Entry;
use tracing::{info, warn};

/// Keychain service holding the Gemini API key.
pub const KEYRING_SERVICE: &str = "grammar-checker-gemini-api";
const KEYRING_USER: &str = "grammar-checker";

fn entry() -> Result<Entry, String> {
    Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", KEYRING_SERVICE, e);
        e.to_string()
    })
}

/// Remember the API key. Only called when the user opted in.
#[tauri::command]
pub fn set_api_key(key: &str) -> Result<(), String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key is empty".to_string());
    }
    info!("Storing API key in keychain");
    entry()?.set_password(key).map_err(|e| {
        warn!("Failed to store API key: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub fn get_api_key() -> Result<Option<String>, String> {
    match entry()?.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            info!("No remembered API key");
            Ok(None)
        }
        Err(e) => {
            warn!("Failed to read API key: {}", e);
            Err(e.to_string())
        }
    }
}

/// Forget the API key. Forgetting a key that was never stored is not an error.
#[tauri::command]
pub fn delete_api_key() -> Result<(), String> {
    info!("Deleting API key from keychain");
    match entry()?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to delete API key: {}", e);
            Err(e.to_string())
        }
    }
}

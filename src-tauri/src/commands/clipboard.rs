use tauri::AppHandle;
use tauri_plugin_clipboard_manager::ClipboardExt;
use tracing::warn;

use crate::checker::Advisory;

/// Copy text to the system clipboard. A failure comes back as the
/// clipboard advisory text, for display next to the result.
#[tauri::command]
pub fn copy_text(app: AppHandle, text: String) -> Result<(), String> {
    app.clipboard().write_text(text).map_err(|e| {
        warn!("Clipboard write failed: {}", e);
        Advisory::ClipboardUnavailable.to_string()
    })
}

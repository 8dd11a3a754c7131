//! Tauri commands for the correction pipeline.

use serde::Serialize;
use tauri::State;
use tracing::{info, warn};

use crate::checker::{self, CheckGate, CheckRequest, CheckResponse, InputAnalysis, OutputContract};
use crate::settings::{CheckerConfig, ModelInfo, Transport};

/// Configuration the UI needs to render its controls.
#[derive(Debug, Serialize)]
pub struct AppConfigView {
    pub max_chars: usize,
    pub models: Vec<ModelInfo>,
    pub default_model: String,
    pub explain_contract: OutputContract,
    pub transport: Transport,
    pub offline_origin: Option<String>,
    pub offline_cache_name: String,
}

/// Run one grammar check. Only one check may be in flight at a time.
#[tauri::command]
pub async fn check_grammar(
    config: State<'_, CheckerConfig>,
    gate: State<'_, CheckGate>,
    request: CheckRequest,
) -> Result<CheckResponse, String> {
    info!(
        "check_grammar: {} chars, model='{}', options={:?}",
        request.text.chars().count(),
        request.model,
        request.options
    );

    let _guard = gate.try_begin().map_err(|e| {
        warn!("Rejected overlapping check");
        String::from(e)
    })?;

    checker::run_check(&config, &request).await.map_err(|e| {
        warn!("Check failed: {}", e);
        e.into()
    })
}

/// Word/char counts and readability for the input pane.
#[tauri::command]
pub fn analyze_input(config: State<'_, CheckerConfig>, text: String) -> InputAnalysis {
    checker::analyze_input(&text, config.limits.max_chars)
}

#[tauri::command]
pub fn get_app_config(config: State<'_, CheckerConfig>) -> AppConfigView {
    AppConfigView {
        max_chars: config.limits.max_chars,
        models: config.model.available.clone(),
        default_model: config.model.default.clone(),
        explain_contract: config.explain.contract,
        transport: config.endpoint.transport,
        offline_origin: config.offline.origin.clone(),
        offline_cache_name: config.offline.cache_name.clone(),
    }
}

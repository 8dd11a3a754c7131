//! Deployment configuration loaded from TOML.
//!
//! Provides two loading methods:
//! - `default_config()` - Loads the configuration compiled into the binary
//! - `load_config(path)` - Loads an override file from disk

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::checker::OutputContract;
use crate::error::CheckError;

/// Default configuration embedded in the binary at compile time.
/// Loaded from `src-tauri/config/checker.toml`.
const DEFAULT_CONFIG: &str = include_str!("../config/checker.toml");

/// File name of the optional override in the app config directory.
pub const CONFIG_FILE_NAME: &str = "checker.toml";

/// Tauri store holding user preferences.
pub const PREFERENCES_STORE: &str = "preferences.json";
pub const PREF_MODEL: &str = "model";
pub const PREF_REMEMBER_MODEL: &str = "remember_model";
pub const PREF_THEME: &str = "theme";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckerConfig {
    pub limits: LimitsConfig,
    pub model: ModelConfig,
    pub endpoint: EndpointConfig,
    pub explain: ExplainConfig,
    pub offline: OfflineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum input length in characters, measured on the trimmed text.
    pub max_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    pub default: String,
    pub available: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Direct,
    Proxy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub transport: Transport,
    pub api_base: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExplainConfig {
    /// Contract used when explanations are requested. Never `plain`.
    pub contract: OutputContract,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OfflineConfig {
    pub cache_name: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub network_only_hosts: Vec<String>,
}

/// The model a check should use, and whether the saved preference was stale.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChoice {
    pub model: String,
    /// True when a saved model is no longer offered and should be removed.
    pub discard_saved: bool,
}

impl CheckerConfig {
    /// Reject configurations that would make every check fail.
    pub fn validate(&self) -> Result<(), CheckError> {
        if self.limits.max_chars == 0 {
            return Err(CheckError::Config("limits.max_chars must be positive".to_string()));
        }
        if self.model.available.is_empty() {
            return Err(CheckError::Config("model.available is empty".to_string()));
        }
        if !self.offers_model(&self.model.default) {
            return Err(CheckError::Config(format!(
                "default model '{}' is not in model.available",
                self.model.default
            )));
        }
        if self.endpoint.transport == Transport::Proxy
            && self
                .endpoint
                .proxy_url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty())
        {
            return Err(CheckError::Config(
                "endpoint.transport is \"proxy\" but endpoint.proxy_url is not set".to_string(),
            ));
        }
        if self.explain.contract == OutputContract::Plain {
            return Err(CheckError::Config(
                "explain.contract must be \"delimited\" or \"structured\"".to_string(),
            ));
        }
        Ok(())
    }

    pub fn offers_model(&self, id: &str) -> bool {
        self.model.available.iter().any(|m| m.id == id)
    }

    /// Resolve a saved model preference against the offered models.
    pub fn resolve_model(&self, saved: Option<&str>) -> ModelChoice {
        match saved {
            Some(id) if self.offers_model(id) => ModelChoice {
                model: id.to_string(),
                discard_saved: false,
            },
            Some(id) => {
                warn!("Saved model '{}' is no longer offered, using default", id);
                ModelChoice {
                    model: self.model.default.clone(),
                    discard_saved: true,
                }
            }
            None => ModelChoice {
                model: self.model.default.clone(),
                discard_saved: false,
            },
        }
    }
}

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &Path) -> Result<CheckerConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: CheckerConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Get the default configuration embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_config() -> CheckerConfig {
    toml::from_str(DEFAULT_CONFIG).expect("embedded checker.toml must be valid TOML")
}

/// Use `<config_dir>/checker.toml` when it exists and is valid, otherwise the
/// embedded defaults.
pub fn effective_config(config_dir: Option<&Path>) -> CheckerConfig {
    let Some(path) = config_dir.map(|d| d.join(CONFIG_FILE_NAME)) else {
        return default_config();
    };
    if !path.exists() {
        return default_config();
    }
    match load_config(&path) {
        Ok(config) => {
            info!("Loaded configuration override from {:?}", path);
            config
        }
        Err(e) => {
            warn!("Ignoring invalid configuration at {:?}: {}", path, e);
            default_config()
        }
    }
}

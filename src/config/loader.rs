//! Configuration loading from file system
//!
//! Reads `config.json` from the default data directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

use super::types::{default_config_path, Config};

/// Load configuration from ~/.clipboard_manager/config.json
///
/// Returns Config::default() if the file is missing or can't be parsed.
#[instrument(name = "load_config")]
pub fn load_config() -> Config {
    let config_path = default_config_path();

    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return Config::default();
    }

    match load_config_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                path = %config_path.display(),
                error = %format!("{e:#}"),
                "Failed to load config, using defaults"
            );
            Config::default()
        }
    }
}

/// Load configuration from an explicit path.
///
/// # Errors
/// Returns error if the file can't be read or isn't valid config JSON.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    info!(path = %path.display(), "Successfully loaded config");
    Ok(config)
}

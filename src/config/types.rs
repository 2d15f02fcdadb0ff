//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;

/// Contents of `config.json`. Every field is optional; the `get_*`
/// accessors fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Where the database, images and logs live (default: ~/.clipboard_manager).
    /// A leading `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Entries older than this many days are evicted (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
    /// How often the clipboard is sampled (default: 500)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Returns the data directory with `~` expanded
    pub fn get_data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).as_ref()),
            None => default_data_dir(),
        }
    }

    /// Returns the retention window in days, or DEFAULT_RETENTION_DAYS if not configured
    pub fn get_retention_days(&self) -> u32 {
        self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    /// Returns the poll interval, or DEFAULT_POLL_INTERVAL_MS if not configured.
    /// Never zero.
    pub fn get_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                .max(1),
        )
    }

    pub fn db_path(&self) -> PathBuf {
        self.get_data_dir().join(DATABASE_FILE_NAME)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.get_data_dir().join(IMAGE_DIR_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.get_data_dir().join(LOG_DIR_NAME)
    }
}

/// `~/.clipboard_manager`, or a relative `.clipboard_manager` when there is no home directory
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR_NAME))
}

/// `~/.clipboard_manager/config.json`
pub fn default_config_path() -> PathBuf {
    default_data_dir().join(CONFIG_FILE_NAME)
}

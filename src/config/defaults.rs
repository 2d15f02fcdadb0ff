//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Default retention window for clipboard history (days)
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Default clipboard polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Data directory, relative to the home directory
pub const DEFAULT_DATA_DIR_NAME: &str = ".clipboard_manager";

/// File and directory names inside the data directory
pub const DATABASE_FILE_NAME: &str = "clipboard.db";
pub const IMAGE_DIR_NAME: &str = "images";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_DIR_NAME: &str = "logs";

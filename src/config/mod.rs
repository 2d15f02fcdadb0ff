//! Configuration module - Application settings
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.clipboard_manager/config.json
//! - Default values for all settings
//! - The `Config` type and its path helpers
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

// Re-export defaults that are used externally
pub use defaults::{
    CONFIG_FILE_NAME, DATABASE_FILE_NAME, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETENTION_DAYS,
    IMAGE_DIR_NAME,
};

// Re-export types that are used externally
pub use types::{default_config_path, default_data_dir, Config};

// Re-export loader
pub use loader::{load_config, load_config_from};

#[cfg(test)]
pub use defaults::{DEFAULT_DATA_DIR_NAME, LOG_DIR_NAME};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

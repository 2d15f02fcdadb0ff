//! Clipboard Manager - clipboard history core
//!
//! A background monitor samples the system clipboard, appends new text to a
//! SQLite-backed history and evicts entries older than the retention window.
//! Presentation code (the `clipboard-manager` binary) lists and deletes
//! entries through the same [`Store`].

pub mod clipboard_history;
pub mod config;
pub mod error;
pub mod logging;

pub use clipboard_history::{Entry, EntryId, RetentionPolicy, Store};
pub use error::{ResultExt, StoreError};

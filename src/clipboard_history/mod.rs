//! Clipboard History Module
//!
//! Provides SQLite-backed clipboard history with background monitoring.
//!
//! ## Features
//! - Stores text and image references (paths, never image bytes)
//! - Background polling every 500ms with consecutive-duplicate suppression
//! - Time-based retention (default 30 days), evicted on every poll
//! - Manual deletion by id, by local calendar day, or everything
//! - Grouping by local day for display
//!
//! ## Module Structure
//! - `types`: Core types (EntryId, Entry, EntryKind) and day grouping
//! - `clock`: Time source (system or manual for tests)
//! - `retention`: Eviction threshold for the retention window
//! - `database`: SQLite operations (schema, inserts, deletes, queries)
//! - `stop_signal`: Cancellation token for the monitor thread
//! - `monitor`: Background clipboard polling and eviction
//! - `clipboard`: System clipboard operations
//! - `image_store`: Content-addressed image files

mod clipboard;
mod clock;
mod database;
mod image_store;
mod monitor;
mod retention;
mod stop_signal;
mod types;

// Types
pub use types::{
    group_entries_by_day, group_entries_by_day_in, Entry, EntryId, EntryKind,
    IMAGE_PREVIEW_LABEL,
};

// Time
pub use clock::{Clock, ManualClock, SystemClock};
pub use retention::{threshold_for, RetentionPolicy};

// Database operations
pub use database::Store;

// Monitor
pub use monitor::{
    spawn_monitor, EntrySink, Monitor, MonitorConfig, MonitorHandle, MonitorState, TickOutcome,
};
pub use stop_signal::StopSignal;

// Clipboard operations
pub use clipboard::{copy_entry_to_clipboard, ClipboardSource, MemoryClipboard, SystemClipboard};

// Images
pub use image_store::{compute_image_hash, ImageStore};

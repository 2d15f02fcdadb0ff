//! System clipboard operations
//!
//! The monitor only needs to peek at the current text. Writing back is for
//! presentation code (e.g. "copy this history entry again").

use anyhow::{bail, Context, Result};
use arboard::Clipboard;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::database::Store;
use super::types::{EntryId, EntryKind};

/// Read/write access to a clipboard.
pub trait ClipboardSource {
    /// Current clipboard text. Empty when there is none or the clipboard can't be read.
    fn peek(&mut self) -> String;

    /// Replace the clipboard text.
    fn set_content(&mut self, text: &str) -> Result<()>;
}

/// The OS clipboard via `arboard`.
///
/// The underlying handle is opened lazily on first use, so construct this on
/// the thread that will use it.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
    open_failed_logged: bool,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&mut Clipboard> {
        if self.inner.is_none() {
            let clipboard = Clipboard::new().context("Failed to create clipboard instance")?;
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .context("Clipboard handle missing after open")
    }
}

impl ClipboardSource for SystemClipboard {
    fn peek(&mut self) -> String {
        let text = match self.handle() {
            // No text on the clipboard (image, empty, foreign format) reads as empty
            Ok(clipboard) => clipboard.get_text().unwrap_or_default(),
            Err(e) => {
                if !self.open_failed_logged {
                    warn!(error = %e, "System clipboard unavailable");
                    self.open_failed_logged = true;
                }
                return String::new();
            }
        };
        self.open_failed_logged = false;
        text
    }

    fn set_content(&mut self, text: &str) -> Result<()> {
        self.handle()?
            .set_text(text)
            .context("Failed to set clipboard text")
    }
}

/// In-process clipboard shared between clones. Handy for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Arc<Mutex<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let clipboard = Self::new();
        clipboard.set(text);
        clipboard
    }

    pub fn set(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }

    pub fn get(&self) -> String {
        self.text.lock().clone()
    }
}

impl ClipboardSource for MemoryClipboard {
    fn peek(&mut self) -> String {
        self.get()
    }

    fn set_content(&mut self, text: &str) -> Result<()> {
        self.set(text);
        Ok(())
    }
}

/// Copy a history entry's text back onto the clipboard.
///
/// # Errors
/// Returns error if the entry doesn't exist, is an image entry, or the clipboard write fails.
pub fn copy_entry_to_clipboard(
    store: &Store,
    id: EntryId,
    clipboard: &mut dyn ClipboardSource,
) -> Result<()> {
    let entry = store
        .get(id)
        .context("Failed to look up clipboard entry")?
        .with_context(|| format!("Entry not found: {id}"))?;

    if entry.kind() == EntryKind::Image {
        bail!(
            "Entry {id} is an image stored at {}; only text entries can be copied",
            entry.image_ref.as_deref().unwrap_or_default()
        );
    }

    let text = entry.text_content.unwrap_or_default();
    clipboard.set_content(&text)?;

    debug!(id = %id, text_len = text.len(), "Wrote entry text to clipboard");
    info!(id = %id, "Copied entry to clipboard");
    Ok(())
}

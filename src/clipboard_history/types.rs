//! Clipboard history types
//!
//! Core types for clipboard entries and day grouping.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

/// Placeholder shown in place of image entries in text previews.
pub const IMAGE_PREVIEW_LABEL: &str = "[Image]";

/// Identifier assigned by the store on insert. Strictly increases with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl EntryId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// What an entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Text,
    Image,
}

/// A single persisted clipboard capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    /// Text payload (present for text captures)
    pub text_content: Option<String>,
    /// Opaque reference to an image artifact outside the store (usually a file path)
    pub image_ref: Option<String>,
    /// Set by the store at insert time
    pub captured_at: DateTime<Utc>,
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self.image_ref.as_deref() {
            Some(image_ref) if !image_ref.is_empty() => EntryKind::Image,
            _ => EntryKind::Text,
        }
    }

    /// Text shown for this entry in a list, cut to at most `max_chars` characters.
    ///
    /// Truncation happens on `char` boundaries so a multi-byte character is never split.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.kind() {
            EntryKind::Image => IMAGE_PREVIEW_LABEL.to_string(),
            EntryKind::Text => truncate_chars(self.text_content.as_deref().unwrap_or(""), max_chars),
        }
    }
}

/// Truncate `text` to `max_chars` characters, appending an ellipsis if anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + '…'.len_utf8());
            out.push_str(&text[..byte_idx]);
            out.push('…');
            out
        }
    }
}

/// Group entries by local calendar day of `captured_at`.
///
/// Days are returned newest first. Entries keep their input order within a day.
pub fn group_entries_by_day(entries: Vec<Entry>) -> Vec<(NaiveDate, Vec<Entry>)> {
    group_entries_by_day_in(entries, &Local)
}

/// Testable version of [`group_entries_by_day`] that takes the timezone explicitly
pub fn group_entries_by_day_in<Tz: TimeZone>(
    entries: Vec<Entry>,
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<Entry>)> {
    let mut groups: Vec<(NaiveDate, Vec<Entry>)> = Vec::new();

    for entry in entries {
        let day = entry.captured_at.with_timezone(tz).date_naive();
        match groups.iter_mut().find(|(d, _)| *d == day) {
            Some((_, bucket)) => bucket.push(entry),
            None => groups.push((day, vec![entry])),
        }
    }

    groups.sort_by(|(a, _), (b, _)| b.cmp(a));
    groups
}

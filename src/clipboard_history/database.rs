//! Clipboard history database operations
//!
//! SQLite-backed log of clipboard entries: schema, inserts, range deletes and
//! ordered queries.
//!
//! The store owns two connections to the same file. All mutating operations go
//! through the writer connection behind a single lock (SQLite allows one writer
//! at a time). Queries use the reader connection, which WAL mode lets proceed
//! while a write is in flight.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::types::{Entry, EntryId};
use crate::error::{Result, StoreError};

const ENTRY_COLUMNS: &str = "id, content, image_path, timestamp";

/// Durable clipboard history log
pub struct Store {
    path: PathBuf,
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open (or create) the database at `path` using the wall clock for timestamps.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Open (or create) the database at `path`, stamping entries with `clock`.
    ///
    /// Creates the parent directory if needed and ensures the schema exists.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::unavailable(&path, e))?;
        }

        let writer = Connection::open(&path).map_err(|e| StoreError::unavailable(&path, e))?;

        // WAL lets the reader connection run alongside the writer
        writer
            .execute_batch(
                "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout = 5000;",
            )
            .map_err(|e| StoreError::unavailable(&path, e))?;
        debug!(path = %path.display(), "Enabled WAL mode for clipboard history database");

        let store_writer = Mutex::new(writer);
        create_schema(&store_writer.lock()).map_err(|e| StoreError::unavailable(&path, e))?;

        let reader = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::unavailable(&path, e))?;
        reader
            .execute_batch("PRAGMA busy_timeout = 5000; PRAGMA query_only = ON;")
            .map_err(|e| StoreError::unavailable(&path, e))?;

        info!(path = %path.display(), "Opened clipboard history store");

        Ok(Self {
            path,
            writer: store_writer,
            reader: Mutex::new(reader),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the schema exists. Safe to call any number of times.
    pub fn init(&self) -> Result<()> {
        create_schema(&self.writer.lock()).map_err(|e| StoreError::unavailable(&self.path, e))
    }
}

fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS clipboard (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT,
            image_path TEXT,
            timestamp INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_clipboard_timestamp ON clipboard(timestamp DESC)",
        [],
    )?;

    Ok(())
}

/// Insert operations.
impl Store {
    /// Append a text capture stamped with the store's clock.
    pub fn insert_text(&self, text: &str) -> Result<EntryId> {
        self.insert(Some(text), None, "insert_text")
    }

    /// Append an image capture. `image_ref` is stored as-is and never opened.
    pub fn insert_image(&self, image_ref: &str) -> Result<EntryId> {
        self.insert(None, Some(image_ref), "insert_image")
    }

    fn insert(
        &self,
        content: Option<&str>,
        image_ref: Option<&str>,
        op: &'static str,
    ) -> Result<EntryId> {
        let timestamp = self.clock.now().timestamp_millis();

        let conn = self.writer.lock();
        conn.execute(
            "INSERT INTO clipboard (content, image_path, timestamp) VALUES (?1, ?2, ?3)",
            params![content, image_ref, timestamp],
        )
        .map_err(StoreError::write(op))?;
        let id = EntryId(conn.last_insert_rowid());
        drop(conn);

        debug!(id = %id, op, timestamp, "Added clipboard entry");
        Ok(id)
    }
}

/// Read operations.
impl Store {
    /// All entries, most recent first.
    pub fn query_all(&self) -> Result<Vec<Entry>> {
        let conn = self.reader.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM clipboard ORDER BY timestamp DESC, id DESC"
            ))
            .map_err(StoreError::read("query_all"))?;

        let entries = stmt
            .query_map([], entry_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(StoreError::read("query_all"))?;

        debug!(count = entries.len(), "Retrieved clipboard history");
        Ok(entries)
    }

    /// One page of entries in the same order as [`Store::query_all`].
    pub fn query_page(&self, limit: usize, offset: usize) -> Result<Vec<Entry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let conn = self.reader.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM clipboard
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1 OFFSET ?2"
            ))
            .map_err(StoreError::read("query_page"))?;

        let entries = stmt
            .query_map(params![limit, offset], entry_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(StoreError::read("query_page"))?;

        debug!(
            count = entries.len(),
            limit, offset, "Retrieved clipboard history page"
        );
        Ok(entries)
    }

    pub fn get(&self, id: EntryId) -> Result<Option<Entry>> {
        let conn = self.reader.lock();
        let result = conn.query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM clipboard WHERE id = ?1"),
            params![id.get()],
            entry_from_row,
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::read("get")(e)),
        }
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.reader.lock();
        conn.query_row("SELECT COUNT(*) FROM clipboard", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|c| c as usize)
        .map_err(StoreError::read("count"))
    }

    /// How many entries point at `image_ref`.
    pub fn image_ref_count(&self, image_ref: &str) -> Result<usize> {
        let conn = self.reader.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM clipboard WHERE image_path = ?1",
            params![image_ref],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c as usize)
        .map_err(StoreError::read("image_ref_count"))
    }
}

/// Delete operations.
impl Store {
    /// Remove the entry with `id`. Removing an id that doesn't exist is not an error.
    pub fn delete_by_id(&self, id: EntryId) -> Result<()> {
        let affected = self
            .writer
            .lock()
            .execute("DELETE FROM clipboard WHERE id = ?1", params![id.get()])
            .map_err(StoreError::write("delete_by_id"))?;

        if affected == 0 {
            debug!(id = %id, "Entry already absent, nothing to delete");
        } else {
            info!(id = %id, "Removed clipboard entry");
        }
        Ok(())
    }

    /// Remove entries captured on local calendar days in `[start, end)`.
    pub fn delete_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        let deleted = self.delete_between(local_day_start(start), local_day_start(end))?;
        info!(%start, %end, deleted, "Cleared clipboard entries by date");
        Ok(())
    }

    /// Remove every entry captured on one local calendar day.
    pub fn delete_day(&self, day: NaiveDate) -> Result<()> {
        self.delete_by_date_range(day, day.succ_opt().unwrap_or(NaiveDate::MAX))
    }

    /// Remove entries with `start <= captured_at < end`, returning how many went.
    pub fn delete_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<usize> {
        self.writer
            .lock()
            .execute(
                "DELETE FROM clipboard WHERE timestamp >= ?1 AND timestamp < ?2",
                params![start.timestamp_millis(), end.timestamp_millis()],
            )
            .map_err(StoreError::write("delete_between"))
    }

    /// Truncate the whole log. Idempotent.
    pub fn delete_all(&self) -> Result<()> {
        let deleted = self
            .writer
            .lock()
            .execute("DELETE FROM clipboard", [])
            .map_err(StoreError::write("delete_all"))?;

        info!(deleted, "Cleared all clipboard history");
        Ok(())
    }

    /// Remove entries with `captured_at < threshold`, returning how many went.
    pub fn delete_older_than(&self, threshold: DateTime<Utc>) -> Result<usize> {
        let cutoff = threshold_millis(threshold);
        let deleted = self
            .writer
            .lock()
            .execute(
                "DELETE FROM clipboard WHERE timestamp < ?1",
                params![cutoff],
            )
            .map_err(StoreError::write("delete_older_than"))?;

        if deleted > 0 {
            debug!(deleted, cutoff, "Pruned old clipboard entries");
        }
        Ok(deleted)
    }
}

/// Millisecond cutoff such that `stored < cutoff` iff `captured_at < threshold`.
///
/// Stored timestamps are whole milliseconds, so a threshold with a sub-millisecond
/// remainder rounds up: an entry at `floor(threshold)` ms is still older.
fn threshold_millis(threshold: DateTime<Utc>) -> i64 {
    let millis = threshold.timestamp_millis();
    if threshold.timestamp_subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis.saturating_add(1)
    }
}

/// Instant of local midnight at the start of `day`.
fn local_day_start(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // Midnight skipped by a DST jump; fall back to the UTC reading
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let millis: i64 = row.get(3)?;
    let captured_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {millis}").into(),
        )
    })?;

    Ok(Entry {
        id: EntryId(row.get(0)?),
        text_content: row.get(1)?,
        image_ref: row.get(2)?,
        captured_at,
    })
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod tests;

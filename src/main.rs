use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use clipboard_manager::clipboard_history::{
    copy_entry_to_clipboard, group_entries_by_day, spawn_monitor, Entry, EntryId, ImageStore,
    MonitorConfig, RetentionPolicy, Store, SystemClipboard, SystemClock,
};
use clipboard_manager::config::{load_config, load_config_from, Config};
use clipboard_manager::error::{ResultExt, StoreError};
use clipboard_manager::logging;

/// Characters of entry text shown per line in `list`
const PREVIEW_CHARS: usize = 80;

#[derive(Parser)]
#[command(name = "clipboard-manager")]
#[command(about = "Clipboard history with time-based retention", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.clipboard_manager/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory from the config file
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record clipboard changes until stdin closes or `quit` is entered
    Watch,
    /// Show history, most recent first, grouped by day
    List {
        /// Show at most N entries
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print entries as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Delete one entry by id
    Delete { id: i64 },
    /// Delete all history
    Clear,
    /// Delete every entry captured on a local calendar day (YYYY-MM-DD)
    ClearDay { day: NaiveDate },
    /// Evict entries older than the retention window now
    Prune,
    /// Put an entry's text back on the clipboard
    Copy { id: i64 },
    /// Store an image file and record it in history
    AddImage { file: PathBuf },
    /// Delete stored images that no entry references
    GcImages,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }

    let log_guard = logging::init(&config.log_dir());

    if let Err(err) = run(cli.command, &config, log_guard.log_path()) {
        error!(error = %format!("{err:#}"), "Command failed");
        eprintln!("{}", failure_message(&err));
        // process::exit skips destructors, flush the log file first
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Commands, config: &Config, log_path: Option<&Path>) -> Result<()> {
    let store = Arc::new(
        Store::open(config.db_path()).context("Failed to open clipboard history")?,
    );

    match command {
        Commands::Watch => run_watch(store, config, log_path),
        Commands::List { limit, json } => run_list(&store, limit, json),
        Commands::Delete { id } => run_delete(&store, config, EntryId(id)),
        Commands::Clear => {
            store.delete_all().context("Failed to clear history")?;
            println!("Cleared clipboard history");
            Ok(())
        }
        Commands::ClearDay { day } => {
            store
                .delete_day(day)
                .with_context(|| format!("Failed to clear entries for {day}"))?;
            println!("Cleared entries from {day}");
            Ok(())
        }
        Commands::Prune => run_prune(&store, config),
        Commands::Copy { id } => {
            copy_entry_to_clipboard(&store, EntryId(id), &mut SystemClipboard::new())?;
            println!("Copied entry {id} to clipboard");
            Ok(())
        }
        Commands::AddImage { file } => run_add_image(&store, config, file),
        Commands::GcImages => run_gc_images(&store, config),
    }
}

/// What to print when a command fails. Store failures get their short
/// user-facing message; anything else prints the full context chain.
fn failure_message(err: &anyhow::Error) -> String {
    let Some(store_err) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
    else {
        return format!("Error: {err:#}");
    };

    let context = err.to_string();
    if context == store_err.to_string() {
        format!("Error: {}", store_err.user_message())
    } else {
        format!("Error: {context}: {}", store_err.user_message())
    }
}

fn monitor_config(config: &Config) -> MonitorConfig {
    MonitorConfig {
        poll_interval: config.get_poll_interval(),
        retention: RetentionPolicy::from_days(config.get_retention_days()),
    }
}

fn run_watch(store: Arc<Store>, config: &Config, log_path: Option<&Path>) -> Result<()> {
    let handle = spawn_monitor(
        store.clone(),
        SystemClipboard::new,
        Arc::new(SystemClock),
        monitor_config(config),
    )?;

    println!("Watching clipboard. Type 'quit' or press Ctrl+D to stop.");
    if let Some(path) = log_path {
        println!("Logging to {}", path.display());
    }

    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) if line.trim() == "quit" => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin, stopping");
                break;
            }
        }
    }

    handle.stop();
    handle.join()?;

    let total = store.count().warn_on_err().unwrap_or_default();
    info!(total, "Stopped watching clipboard");
    println!("Stopped. {total} entries in history.");
    Ok(())
}

fn run_list(store: &Store, limit: Option<usize>, json: bool) -> Result<()> {
    let entries = match limit {
        Some(limit) => store.query_page(limit, 0),
        None => store.query_all(),
    }
    .context("Failed to read history")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Clipboard history is empty");
        return Ok(());
    }

    for (day, group) in group_entries_by_day(entries) {
        println!("{day}");
        for entry in &group {
            println!("{}", format_entry_line(entry));
        }
    }
    Ok(())
}

fn format_entry_line(entry: &Entry) -> String {
    let time = entry.captured_at.with_timezone(&Local).format("%H:%M:%S");
    // Keep each entry on one line
    let preview = entry.preview(PREVIEW_CHARS).replace(['\n', '\r'], " ");
    format!("  {:>6}  {time}  {preview}", entry.id.get())
}

fn run_delete(store: &Store, config: &Config, id: EntryId) -> Result<()> {
    let Some(entry) = store.get(id).context("Failed to look up entry")? else {
        println!("No entry {id}");
        return Ok(());
    };

    store
        .delete_by_id(id)
        .with_context(|| format!("Failed to delete entry {id}"))?;
    println!("Deleted entry {id}");

    if let Some(image_ref) = entry.image_ref.as_deref() {
        let images = ImageStore::new(config.image_dir())?;
        if images.remove_if_unreferenced(store, image_ref)? {
            println!("Removed image file {image_ref}");
        }
    }
    Ok(())
}

fn run_prune(store: &Store, config: &Config) -> Result<()> {
    let policy = RetentionPolicy::from_days(config.get_retention_days());
    let threshold = policy.threshold(Utc::now());
    let evicted = store
        .delete_older_than(threshold)
        .context("Failed to prune history")?;

    info!(evicted, threshold = %threshold, "Manual prune completed");
    println!("Removed {evicted} entries older than {threshold}");
    Ok(())
}

fn run_add_image(store: &Store, config: &Config, file: PathBuf) -> Result<()> {
    let images = ImageStore::new(config.image_dir())?;
    let stored = images.import_file(&file)?;
    let image_ref = stored
        .to_str()
        .context("Stored image path is not valid UTF-8")?;

    let id = store
        .insert_image(image_ref)
        .context("Failed to record image entry")?;

    println!("Added image entry {id}: {image_ref}");
    Ok(())
}

fn run_gc_images(store: &Store, config: &Config) -> Result<()> {
    let images = ImageStore::new(config.image_dir())?;
    let referenced: HashSet<String> = store
        .query_all()
        .context("Failed to read history")?
        .into_iter()
        .filter_map(|entry| entry.image_ref)
        .collect();

    let deleted = images.gc_orphans(&referenced)?;
    println!("Removed {deleted} unreferenced images");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tempfile::TempDir;

    fn write_failure(op: &'static str) -> StoreError {
        StoreError::WriteFailed {
            op,
            source: rusqlite::Error::InvalidQuery,
        }
    }

    #[test]
    fn test_failure_message_uses_store_user_message() {
        let err = anyhow::Error::new(write_failure("delete_all")).context("Failed to clear history");

        assert_eq!(
            failure_message(&err),
            "Error: Failed to clear history: Could not update clipboard history (delete_all)"
        );
    }

    #[test]
    fn test_failure_message_bare_store_error() {
        let err = anyhow::Error::new(write_failure("delete_day"));

        assert_eq!(
            failure_message(&err),
            "Error: Could not update clipboard history (delete_day)"
        );
    }

    #[test]
    fn test_failure_message_other_errors_keep_chain() {
        let err = anyhow!("disk on fire").context("Failed to read image file");

        assert_eq!(
            failure_message(&err),
            "Error: Failed to read image file: disk on fire"
        );
    }

    #[test]
    fn test_delete_removes_image_file_after_last_reference() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..Config::default()
        };
        let store = Store::open(config.db_path()).unwrap();
        let images = ImageStore::new(config.image_dir()).unwrap();
        let stored = images.import_bytes(b"pixels", "png").unwrap();
        let image_ref = stored.to_str().unwrap();
        let first = store.insert_image(image_ref).unwrap();
        let second = store.insert_image(image_ref).unwrap();

        run_delete(&store, &config, first).unwrap();
        assert!(stored.exists());

        run_delete(&store, &config, second).unwrap();
        assert!(!stored.exists());
        assert_eq!(store.count().unwrap(), 0);
    }
}

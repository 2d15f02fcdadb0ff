//! Structured JSONL logging to a file plus human-readable stderr output.
//!
//! - **JSONL to file** (`<data_dir>/logs/clipboard-manager.jsonl`), one JSON object per line
//! - **Compact to stderr** for whoever is watching the terminal
//!
//! # Usage
//!
//! ```rust,ignore
//! use clipboard_manager::logging;
//!
//! // MUST keep guard alive for duration of program
//! let _guard = logging::init(&config.log_dir());
//!
//! tracing::info!(entry_id = 42, "Added text entry to history");
//! ```
//!
//! # JSONL Output Format
//!
//! ```json
//! {"timestamp":"2025-01-15T12:00:00.123Z","level":"INFO","target":"clipboard_manager::clipboard_history::database","fields":{"message":"Opened clipboard history store","path":"/home/me/.clipboard_manager/clipboard.db"}}
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "clipboard-manager.jsonl";
const DEFAULT_FILTER: &str = "info";

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

impl LoggingGuard {
    /// Where JSONL logs are going, if the file could be opened.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}

/// Path of the JSONL log inside `log_dir`.
pub fn log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the dual-output logging system.
///
/// If the log file can't be opened, logging continues on stderr only.
/// Returns a guard that MUST be kept alive for the duration of the program.
pub fn init(log_dir: &Path) -> LoggingGuard {
    let path = log_path(log_dir);
    let file = fs::create_dir_all(log_dir)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));

    let (json_layer, file_guard, log_path) = match file {
        Ok(file) => {
            // Non-blocking so a slow disk never stalls the monitor thread
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);
            (Some(layer), Some(guard), Some(path))
        }
        Err(e) => {
            eprintln!(
                "[LOGGING] Failed to open log file {}: {e}; logging to stderr only",
                path.display()
            );
            (None, None, None)
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(json_layer)
        .with(stderr_layer)
        .try_init();

    if let Err(e) = installed {
        eprintln!("[LOGGING] Subscriber already installed: {e}");
    }

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = ?log_path,
        "Application logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
        log_path,
    }
}

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Boxed source for failures that are not SQLite errors (e.g. directory creation).
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the clipboard history store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be opened or created.
    #[error("Clipboard store unavailable at '{}': {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },

    /// An individual insert or delete failed.
    #[error("Clipboard store write failed ({op}): {source}")]
    WriteFailed {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A query failed.
    #[error("Clipboard store read failed ({op}): {source}")]
    ReadFailed {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: impl Into<BoxedSource>) -> Self {
        Self::Unavailable {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn write(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::WriteFailed { op, source }
    }

    pub(crate) fn read(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::ReadFailed { op, source }
    }

    /// Short message suitable for showing to the person who triggered the action.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable { path, .. } => {
                format!("Could not open clipboard history at {}", path.display())
            }
            Self::WriteFailed { op, .. } => format!("Could not update clipboard history ({op})"),
            Self::ReadFailed { op, .. } => format!("Could not read clipboard history ({op})"),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Extension trait for logging an error and carrying on.
///
/// Use where a failure is recoverable and only affects a summary, such as
/// the entry count printed after `watch` stops.
///
/// ```ignore
/// use clipboard_manager::error::ResultExt;
///
/// let total = store.count().warn_on_err().unwrap_or_default();
/// ```
pub trait ResultExt<T> {
    /// Log as warning with caller location and return None.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = %err,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

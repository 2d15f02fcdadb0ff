//! Clipboard monitoring
//!
//! A single background thread samples the clipboard on a fixed cadence,
//! records new text in the history and evicts entries that have aged out of
//! the retention window.
//!
//! Each cycle:
//! 1. stop if cancellation has been signalled
//! 2. peek the clipboard; a non-empty value that differs from the last one
//!    seen is inserted
//! 3. evict everything older than `now - window`
//! 4. sleep until the next tick, waking early on cancellation
//!
//! Failures in 2 and 3 are logged and the loop keeps going. A value whose
//! insert failed is still remembered as seen, so it is dropped rather than
//! retried on the next tick.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::clipboard::ClipboardSource;
use super::clock::Clock;
use super::database::Store;
use super::retention::RetentionPolicy;
use super::stop_signal::StopSignal;
use super::types::EntryId;
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error;

/// Where the monitor writes. Implemented by [`Store`].
pub trait EntrySink: Send + Sync {
    fn insert_text(&self, text: &str) -> error::Result<EntryId>;
    fn delete_older_than(&self, threshold: DateTime<Utc>) -> error::Result<usize>;
}

impl EntrySink for Store {
    fn insert_text(&self, text: &str) -> error::Result<EntryId> {
        Store::insert_text(self, text)
    }

    fn delete_older_than(&self, threshold: DateTime<Utc>) -> error::Result<usize> {
        Store::delete_older_than(self, threshold)
    }
}

/// Monitor cadence and retention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub retention: RetentionPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retention: RetentionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    /// Terminal. A stopped monitor is never restarted.
    Stopped,
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Id of the entry inserted this tick, if any.
    pub captured: Option<EntryId>,
    pub evicted: usize,
    pub insert_failed: bool,
    pub evict_failed: bool,
}

pub struct Monitor<C> {
    sink: Arc<dyn EntrySink>,
    source: C,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    stop: StopSignal,
    last_observed: Option<String>,
    state: MonitorState,
    run_id: String,
}

impl<C: ClipboardSource> Monitor<C> {
    pub fn new(
        sink: Arc<dyn EntrySink>,
        source: C,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
        stop: StopSignal,
    ) -> Self {
        Self {
            sink,
            source,
            clock,
            config,
            stop,
            last_observed: None,
            state: MonitorState::Running,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// `Stopped` once [`Monitor::run`] has returned.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Run one capture + eviction cycle.
    pub fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let current = self.source.peek();
        if !current.is_empty() && self.last_observed.as_deref() != Some(current.as_str()) {
            debug!(
                run_id = %self.run_id,
                text_len = current.len(),
                "New text detected in clipboard"
            );

            match self.sink.insert_text(&current) {
                Ok(id) => {
                    debug!(run_id = %self.run_id, entry_id = %id, "Added text entry to history");
                    outcome.captured = Some(id);
                }
                Err(e) => {
                    warn!(
                        run_id = %self.run_id,
                        op = "insert_text",
                        text_len = current.len(),
                        error = %e,
                        "Failed to add text entry to history"
                    );
                    outcome.insert_failed = true;
                }
            }
            // Remembered even on failure: a failed capture is dropped, not retried
            self.last_observed = Some(current);
        }

        let threshold = self.config.retention.threshold(self.clock.now());
        match self.sink.delete_older_than(threshold) {
            Ok(evicted) => {
                if evicted > 0 {
                    info!(
                        run_id = %self.run_id,
                        evicted,
                        threshold = %threshold,
                        "Evicted expired clipboard entries"
                    );
                }
                outcome.evicted = evicted;
            }
            Err(e) => {
                warn!(
                    run_id = %self.run_id,
                    op = "delete_older_than",
                    threshold = %threshold,
                    error = %e,
                    "Failed to evict expired clipboard entries"
                );
                outcome.evict_failed = true;
            }
        }

        outcome
    }

    /// Poll until cancelled, then mark the monitor `Stopped`.
    pub fn run(&mut self) {
        info!(
            run_id = %self.run_id,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            retention_secs = self.config.retention.window().num_seconds(),
            "Clipboard monitor started"
        );

        let mut ticks: u64 = 0;
        loop {
            if self.stop.is_cancelled() {
                break;
            }

            let start = Instant::now();
            self.tick();
            ticks += 1;

            let remaining = self.config.poll_interval.saturating_sub(start.elapsed());
            self.stop.wait_timeout(remaining);
        }

        self.state = MonitorState::Stopped;
        info!(run_id = %self.run_id, ticks, "Clipboard monitor stopped");
    }
}

/// Handle to a monitor running on its own thread.
///
/// Dropping the handle signals cancellation but does not wait for the thread.
pub struct MonitorHandle {
    stop: StopSignal,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Signal cancellation. The monitor stops before its next cycle.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// `Stopped` once the monitor thread has exited.
    pub fn state(&self) -> MonitorState {
        if self.is_finished() {
            MonitorState::Stopped
        } else {
            MonitorState::Running
        }
    }

    /// Wait for the monitor thread to exit. Does not signal cancellation itself.
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| anyhow!("Clipboard monitor thread panicked")),
            None => Ok(()),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop.cancel();
        }
    }
}

/// Start a monitor on a background thread named `clipboard-monitor`.
///
/// The clipboard source is built by `make_source` on the monitor thread, so
/// platform clipboard handles never cross threads.
///
/// # Errors
/// Returns error if the thread cannot be spawned.
pub fn spawn_monitor<C, F>(
    sink: Arc<dyn EntrySink>,
    make_source: F,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
) -> Result<MonitorHandle>
where
    C: ClipboardSource + 'static,
    F: FnOnce() -> C + Send + 'static,
{
    let stop = StopSignal::new();
    let thread_stop = stop.clone();

    let thread = thread::Builder::new()
        .name("clipboard-monitor".to_string())
        .spawn(move || {
            let mut monitor = Monitor::new(sink, make_source(), clock, config, thread_stop);
            monitor.run();
        })
        .context("Failed to spawn clipboard monitor thread")?;

    Ok(MonitorHandle {
        stop,
        thread: Some(thread),
    })
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;

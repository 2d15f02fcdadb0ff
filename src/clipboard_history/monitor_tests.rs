use super::*;
use crate::clipboard_history::clipboard::MemoryClipboard;
use crate::clipboard_history::clock::ManualClock;
use crate::error::StoreError;
use chrono::{TimeDelta, TimeZone};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

/// Returns queued values in order, then keeps returning the last one.
struct ScriptedSource {
    queue: VecDeque<String>,
    current: String,
}

impl ScriptedSource {
    fn new(values: &[&str]) -> Self {
        Self {
            queue: values.iter().map(|v| v.to_string()).collect(),
            current: String::new(),
        }
    }
}

impl ClipboardSource for ScriptedSource {
    fn peek(&mut self) -> String {
        if let Some(next) = self.queue.pop_front() {
            self.current = next;
        }
        self.current.clone()
    }

    fn set_content(&mut self, text: &str) -> anyhow::Result<()> {
        self.current = text.to_string();
        Ok(())
    }
}

/// In-memory sink that records calls and can be told to fail.
#[derive(Default)]
struct RecordingSink {
    inserted: Mutex<Vec<String>>,
    thresholds: Mutex<Vec<DateTime<Utc>>>,
    fail_inserts: Mutex<bool>,
    fail_evictions: Mutex<bool>,
    next_id: Mutex<i64>,
}

impl RecordingSink {
    fn inserted(&self) -> Vec<String> {
        self.inserted.lock().clone()
    }
}

impl EntrySink for RecordingSink {
    fn insert_text(&self, text: &str) -> error::Result<EntryId> {
        if *self.fail_inserts.lock() {
            return Err(StoreError::write("insert_text")(
                rusqlite::Error::InvalidQuery,
            ));
        }
        self.inserted.lock().push(text.to_string());
        let mut next = self.next_id.lock();
        *next += 1;
        Ok(EntryId(*next))
    }

    fn delete_older_than(&self, threshold: DateTime<Utc>) -> error::Result<usize> {
        if *self.fail_evictions.lock() {
            return Err(StoreError::write("delete_older_than")(
                rusqlite::Error::InvalidQuery,
            ));
        }
        self.thresholds.lock().push(threshold);
        Ok(0)
    }
}

/// Shared buffer for capturing formatted log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber that writes plain-text logs into the returned buffer.
fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    buffer.contents()
}

fn monitor_with<C: ClipboardSource>(
    sink: Arc<dyn EntrySink>,
    source: C,
    clock: Arc<dyn Clock>,
) -> Monitor<C> {
    Monitor::new(
        sink,
        source,
        clock,
        MonitorConfig::default(),
        StopSignal::new(),
    )
}

#[test]
fn test_distinct_values_inserted_in_order_with_increasing_ids() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let store = Arc::new(
        Store::open_with_clock(dir.path().join("clipboard.db"), clock.clone()).unwrap(),
    );

    let source = ScriptedSource::new(&["alpha", "beta", "gamma"]);
    let mut monitor = monitor_with(store.clone(), source, clock.clone());

    let mut ids = Vec::new();
    for _ in 0..3 {
        let outcome = monitor.tick();
        ids.push(outcome.captured.expect("each distinct value is captured"));
        clock.advance(TimeDelta::seconds(1));
    }

    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids {ids:?}");

    let entries = store.query_all().unwrap();
    let texts: Vec<_> = entries
        .iter()
        .rev()
        .map(|e| e.text_content.clone().unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_repeated_value_is_captured_once() {
    let sink = Arc::new(RecordingSink::default());
    let source = ScriptedSource::new(&["same", "same", "same"]);
    let mut monitor = monitor_with(sink.clone(), source, Arc::new(ManualClock::new(t0())));

    let first = monitor.tick();
    let second = monitor.tick();
    let third = monitor.tick();

    assert!(first.captured.is_some());
    assert_eq!(second.captured, None);
    assert_eq!(third.captured, None);
    assert_eq!(sink.inserted(), vec!["same"]);
}

#[test]
fn test_value_seen_again_after_change_is_captured_again() {
    let sink = Arc::new(RecordingSink::default());
    let source = ScriptedSource::new(&["a", "b", "a"]);
    let mut monitor = monitor_with(sink.clone(), source, Arc::new(ManualClock::new(t0())));

    for _ in 0..3 {
        monitor.tick();
    }

    assert_eq!(sink.inserted(), vec!["a", "b", "a"]);
}

#[test]
fn test_empty_clipboard_is_never_captured() {
    let sink = Arc::new(RecordingSink::default());
    let source = ScriptedSource::new(&["", "text", ""]);
    let mut monitor = monitor_with(sink.clone(), source, Arc::new(ManualClock::new(t0())));

    let outcomes: Vec<_> = (0..3).map(|_| monitor.tick()).collect();

    assert_eq!(outcomes[0].captured, None);
    assert!(outcomes[1].captured.is_some());
    assert_eq!(outcomes[2].captured, None);
    assert_eq!(sink.inserted(), vec!["text"]);
}

#[test]
fn test_failed_insert_is_not_retried_and_loop_continues() {
    let sink = Arc::new(RecordingSink::default());
    let source = ScriptedSource::new(&["lost", "lost", "next"]);
    let mut monitor = monitor_with(sink.clone(), source, Arc::new(ManualClock::new(t0())));

    *sink.fail_inserts.lock() = true;
    let failed = monitor.tick();
    assert!(failed.insert_failed);
    assert_eq!(failed.captured, None);
    // Eviction still ran on the failing tick
    assert!(!failed.evict_failed);
    assert_eq!(sink.thresholds.lock().len(), 1);

    *sink.fail_inserts.lock() = false;
    let repeat = monitor.tick();
    assert!(!repeat.insert_failed);
    assert_eq!(repeat.captured, None, "failed value must not be retried");

    let next = monitor.tick();
    assert!(next.captured.is_some());
    assert_eq!(sink.inserted(), vec!["next"]);
}

#[test]
fn test_failed_eviction_does_not_block_capture() {
    let sink = Arc::new(RecordingSink::default());
    *sink.fail_evictions.lock() = true;
    let source = ScriptedSource::new(&["kept"]);
    let mut monitor = monitor_with(sink.clone(), source, Arc::new(ManualClock::new(t0())));

    let outcome = monitor.tick();

    assert!(outcome.evict_failed);
    assert!(outcome.captured.is_some());
    assert_eq!(sink.inserted(), vec!["kept"]);
}

#[test]
fn test_failures_are_logged_with_operation() {
    let sink = Arc::new(RecordingSink::default());
    *sink.fail_inserts.lock() = true;
    *sink.fail_evictions.lock() = true;
    let mut monitor = monitor_with(
        sink.clone(),
        ScriptedSource::new(&["lost"]),
        Arc::new(ManualClock::new(t0())),
    );

    let logs = capture_logs(|| {
        monitor.tick();
    });

    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("Failed to add text entry to history"), "logs: {logs}");
    assert!(logs.contains("insert_text"), "logs: {logs}");
    assert!(logs.contains("Failed to evict expired clipboard entries"), "logs: {logs}");
    assert!(logs.contains("delete_older_than"), "logs: {logs}");
}

#[test]
fn test_eviction_threshold_is_now_minus_window() {
    let sink = Arc::new(RecordingSink::default());
    let clock = Arc::new(ManualClock::new(t0()));
    let mut monitor = Monitor::new(
        sink.clone() as Arc<dyn EntrySink>,
        ScriptedSource::new(&[]),
        clock.clone(),
        MonitorConfig {
            poll_interval: Duration::from_millis(10),
            retention: RetentionPolicy::new(TimeDelta::hours(24)),
        },
        StopSignal::new(),
    );

    monitor.tick();
    clock.advance(TimeDelta::hours(1));
    monitor.tick();

    assert_eq!(
        *sink.thresholds.lock(),
        vec![
            t0() - TimeDelta::hours(24),
            t0() + TimeDelta::hours(1) - TimeDelta::hours(24)
        ]
    );
}

#[test]
fn test_tick_evicts_expired_entries_from_store() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let store = Arc::new(
        Store::open_with_clock(dir.path().join("clipboard.db"), clock.clone()).unwrap(),
    );
    store.insert_text("old").unwrap();

    clock.advance(TimeDelta::days(31));
    let mut monitor = monitor_with(store.clone(), ScriptedSource::new(&[]), clock.clone());

    let outcome = monitor.tick();

    assert_eq!(outcome.evicted, 1);
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_cancel_before_run_stops_without_ticking() {
    let sink = Arc::new(RecordingSink::default());
    let stop = StopSignal::new();
    let mut monitor = Monitor::new(
        sink.clone() as Arc<dyn EntrySink>,
        ScriptedSource::new(&["never"]),
        Arc::new(ManualClock::new(t0())),
        MonitorConfig::default(),
        stop.clone(),
    );
    assert_eq!(monitor.state(), MonitorState::Running);

    stop.cancel();
    monitor.run();

    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert!(sink.inserted().is_empty());
    assert!(sink.thresholds.lock().is_empty());
}

#[test]
fn test_spawned_monitor_captures_then_stops() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path().join("clipboard.db")).unwrap());
    let clipboard = MemoryClipboard::with_text("first copy");

    let handle = {
        let clipboard = clipboard.clone();
        spawn_monitor(
            store.clone(),
            move || clipboard,
            Arc::new(crate::clipboard_history::clock::SystemClock),
            MonitorConfig {
                poll_interval: Duration::from_millis(10),
                retention: RetentionPolicy::default(),
            },
        )
        .unwrap()
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while store.count().unwrap() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(store.count().unwrap(), 1);

    handle.stop();
    handle.join().unwrap();

    clipboard.set("after stop");
    thread::sleep(Duration::from_millis(50));

    let entries = store.query_all().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text_content.as_deref(), Some("first copy"));
}

#[test]
fn test_handle_reports_stopped_after_thread_exits() {
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_monitor(
        sink.clone(),
        || ScriptedSource::new(&[]),
        Arc::new(ManualClock::new(t0())),
        MonitorConfig {
            poll_interval: Duration::from_secs(30),
            retention: RetentionPolicy::default(),
        },
    )
    .unwrap();
    assert_eq!(handle.state(), MonitorState::Running);

    handle.stop();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(handle.state(), MonitorState::Stopped);
    handle.join().unwrap();
}

#[test]
fn test_dropping_handle_cancels_monitor() {
    let sink = Arc::new(RecordingSink::default());
    let handle = spawn_monitor(
        sink.clone(),
        || ScriptedSource::new(&[]),
        Arc::new(ManualClock::new(t0())),
        MonitorConfig {
            poll_interval: Duration::from_secs(30),
            retention: RetentionPolicy::default(),
        },
    )
    .unwrap();
    let stop = handle.stop_signal();

    drop(handle);

    assert!(stop.is_cancelled());
}

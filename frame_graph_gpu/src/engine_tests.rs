//! Unit tests for the Engine logging facade
//!
//! IMPORTANT: the logger is a global shared across all tests.
//! Tests that install one are marked with #[serial].

use super::{capture, Engine};
use crate::log::{LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that only counts entries
struct CountingLogger {
    count: Arc<Mutex<usize>>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

// ============================================================================
// LOGGER MANAGEMENT
// ============================================================================

#[test]
#[serial]
fn test_set_logger_receives_entries() {
    let entries = capture::install();

    Engine::log(LogSeverity::Info, "framegraph::test", "plan rebuilt".to_string());

    let captured = entries.lock().unwrap().clone();
    let entry = captured
        .iter()
        .find(|e| e.source == "framegraph::test")
        .expect("entry captured");
    assert_eq!(entry.severity, LogSeverity::Info);
    assert_eq!(entry.message, "plan rebuilt");
    assert!(entry.file.is_none());
    assert!(entry.line.is_none());

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_log_detailed_carries_file_and_line() {
    let entries = capture::install();

    Engine::log_detailed(LogSeverity::Error, "framegraph::test", "boom".to_string(), "alloc.rs", 42);

    let captured = entries.lock().unwrap().clone();
    let entry = captured
        .iter()
        .find(|e| e.source == "framegraph::test" && e.message == "boom")
        .expect("entry captured");
    assert_eq!(entry.file, Some("alloc.rs"));
    assert_eq!(entry.line, Some(42));

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_set_logger_replaces_previous_logger() {
    let first = capture::install();
    let count = Arc::new(Mutex::new(0));
    Engine::set_logger(CountingLogger { count: count.clone() });

    Engine::log(LogSeverity::Warn, "framegraph::test", "replaced".to_string());

    assert_eq!(capture::count_matching(&first, LogSeverity::Warn, "replaced"), 0);
    assert!(*count.lock().unwrap() >= 1);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let entries = capture::install();
    Engine::reset_logger();

    Engine::log(LogSeverity::Debug, "framegraph::test", "after reset".to_string());

    assert_eq!(capture::count_matching(&entries, LogSeverity::Debug, "after reset"), 0);
}

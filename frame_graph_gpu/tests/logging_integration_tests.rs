//! Integration tests for Engine logging system
//!
//! These tests verify the logging system through the public API.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use frame_graph_gpu::framegraph::{Engine, Error};
use frame_graph_gpu::framegraph::log::{Logger, LogEntry, LogSeverity};
use frame_graph_gpu::{engine_info, engine_warn, engine_error, engine_err};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn from_source(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<LogEntry> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == source)
        .cloned()
        .collect()
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    engine_info!("framegraph::integration", "plan rebuilt with {} groups", 3);
    engine_warn!("framegraph::integration", "resource '{}' unreferenced", "bloom_tmp");

    let logged = from_source(&entries, "framegraph::integration");
    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].severity, LogSeverity::Info);
    assert_eq!(logged[0].message, "plan rebuilt with 3 groups");
    assert_eq!(logged[1].severity, LogSeverity::Warn);
    assert!(logged[1].message.contains("bloom_tmp"));

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logs_carry_location() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    engine_error!("framegraph::integration", "device lost");

    let logged = from_source(&entries, "framegraph::integration");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].severity, LogSeverity::Error);
    assert!(logged[0].file.is_some());
    assert!(logged[0].line.is_some());

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_engine_err_logs_and_builds_error() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    let error = engine_err!("framegraph::integration", "pool {} exhausted", 2);

    assert_eq!(error, Error::BackendError("pool 2 exhausted".to_string()));
    let logged = from_source(&entries, "framegraph::integration");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].message, "pool 2 exhausted");

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_default_logger_restored() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    Engine::reset_logger();

    engine_info!("framegraph::integration", "goes to the console");

    assert!(from_source(&entries, "framegraph::integration").is_empty());
}

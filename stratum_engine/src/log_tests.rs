//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and the logger slot.
//! Entries captured from the process-wide slot are filtered by source, since
//! other tests in this binary log concurrently.

use crate::log::{
    log, log_detailed, min_severity, reset_logger, set_logger, set_min_severity, DefaultLogger,
    LogEntry, LogSeverity, Logger,
};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

// ============================================================================
// HELPERS
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
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

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "test".to_string(),
        message: format!("{:?} message", severity),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Warn), "Warn");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_with_file_line() {
    let e = entry(LogSeverity::Error, Some("vulkan_present.rs"), Some(42));
    assert_eq!(e.severity, LogSeverity::Error);
    assert_eq!(e.file, Some("vulkan_present.rs"));
    assert_eq!(e.line, Some(42));
}

#[test]
fn test_log_entry_debug() {
    let e = entry(LogSeverity::Debug, None, None);
    let debug_str = format!("{:?}", e);
    assert!(debug_str.contains("Debug"));
    assert!(debug_str.contains("test"));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify neither branch panics
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("test.rs"), Some(7)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}

// ============================================================================
// LOGGER SLOT TESTS
// ============================================================================

#[test]
#[serial]
fn test_custom_logger_receives_entries() {
    let (logger, entries) = CaptureLogger::new();
    set_logger(logger);

    log(LogSeverity::Info, "test::slot", "first".to_string());
    log(LogSeverity::Warn, "test::slot", "second".to_string());

    let captured = from_source(&entries, "test::slot");
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].message, "first");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert!(captured[0].file.is_none());

    reset_logger();
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let (logger, entries) = CaptureLogger::new();
    set_logger(logger);

    log_detailed(LogSeverity::Error, "test::detailed", "boom".to_string(), "frame.rs", 99);

    let captured = from_source(&entries, "test::detailed");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].file, Some("frame.rs"));
    assert_eq!(captured[0].line, Some(99));

    reset_logger();
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let (logger, entries) = CaptureLogger::new();
    set_logger(logger);
    log(LogSeverity::Info, "test::reset", "kept".to_string());

    reset_logger();
    log(LogSeverity::Info, "test::reset", "dropped".to_string());

    assert_eq!(from_source(&entries, "test::reset").len(), 1);
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let (logger, entries) = CaptureLogger::new();
    set_logger(logger);
    set_min_severity(LogSeverity::Warn);
    assert_eq!(min_severity(), LogSeverity::Warn);

    log(LogSeverity::Debug, "test::filter", "hidden".to_string());
    log(LogSeverity::Warn, "test::filter", "shown".to_string());

    set_min_severity(LogSeverity::Trace);
    reset_logger();

    let captured = from_source(&entries, "test::filter");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "shown");
}

#[test]
#[serial]
fn test_macros_route_through_slot() {
    let (logger, entries) = CaptureLogger::new();
    set_logger(logger);

    crate::engine_info!("test::macros", "ready with {} images", 3);
    crate::engine_error!("test::macros", "failed: {}", "oops");
    let err = crate::engine_err!("test::macros", "submit failed ({})", -4);

    reset_logger();

    let captured = from_source(&entries, "test::macros");
    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].message, "ready with 3 images");
    assert!(captured[0].line.is_none());
    assert_eq!(captured[1].severity, LogSeverity::Error);
    assert!(captured[1].line.is_some());
    assert_eq!(captured[2].message, "submit failed (-4)");
    assert_eq!(err, crate::error::Error::BackendError("submit failed (-4)".to_string()));
}

//! Behavior-driven tests for the DuckDB audit store.

use std::time::Duration;

use duckdb::Connection;
use qrand_audit::{AuditLog, AuditLogConfig, AuditLogError};
use qrand_core::{AuditRecord, AuditSink, RequestedCount};
use tempfile::tempdir;

fn config(dir: &std::path::Path) -> AuditLogConfig {
    AuditLogConfig {
        qrand_home: dir.to_path_buf(),
        db_path: dir.join("nested").join("audit.duckdb"),
        max_pool_size: 2,
    }
}

fn failed(source: &str) -> AuditRecord {
    AuditRecord {
        source_name: source.to_owned(),
        requested_count: RequestedCount::new(5).expect("valid count"),
        numbers: None,
        error_message: Some(String::from("upstream returned status 500 (http.status)")),
    }
}

fn succeeded(source: &str, numbers: Vec<i64>) -> AuditRecord {
    AuditRecord {
        source_name: source.to_owned(),
        requested_count: RequestedCount::new(5).expect("valid count"),
        numbers: Some(numbers),
        error_message: None,
    }
}

// =============================================================================
// Schema lifecycle
// =============================================================================

#[test]
fn fresh_store_creates_schema_on_first_use() {
    // Given: a directory with no audit store
    let temp = tempdir().expect("tempdir");
    let config = config(temp.path());

    // When: the audit log is opened
    let log = AuditLog::open(config.clone()).expect("open");

    // Then: the database file exists and holds no records yet
    assert!(config.db_path.exists());
    assert_eq!(log.record_count().expect("count"), 0);
}

#[test]
fn compatible_store_is_reopened_and_keeps_history() {
    // Given: a store that already holds one record
    let temp = tempdir().expect("tempdir");
    let first = AuditLog::open(config(temp.path())).expect("open");
    first.record(&failed("a")).expect("record");
    let first_run = first.run_id();
    drop(first);

    // When: it is reopened by a later run
    let second = AuditLog::open(config(temp.path())).expect("reopen");
    second.record(&succeeded("b", vec![1, 2])).expect("record");

    // Then: both records are present and grouped by run
    let rows = second.recent_records(10).expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].run_id, Some(first_run.to_string()));
    assert_eq!(rows[0].run_id, Some(second.run_id().to_string()));
    assert_ne!(first_run, second.run_id());
}

#[test]
fn legacy_store_without_run_column_is_accepted() {
    // Given: a store written by an older tool without run grouping
    let temp = tempdir().expect("tempdir");
    let config = config(temp.path());
    std::fs::create_dir_all(config.db_path.parent().expect("parent")).expect("mkdir");
    {
        let connection = Connection::open(&config.db_path).expect("legacy db");
        connection
            .execute_batch(
                "CREATE TABLE runs (id INTEGER PRIMARY KEY, ts TEXT NOT NULL, api_name TEXT, \
                 count INTEGER, numbers TEXT, success BOOLEAN, error_msg TEXT); \
                 INSERT INTO runs VALUES (7, '2024-05-01T10:00:00Z', 'HotBits', 5, NULL, FALSE, 'dns');",
            )
            .expect("legacy schema");
    }

    // When: the audit log is opened and a record appended
    let log = AuditLog::open(config).expect("compatible legacy store");
    let id = log.append(&succeeded("QRandom.io", vec![9])).expect("append");

    // Then: ids continue after the existing history
    assert_eq!(id, 8);
    let rows = log.recent_records(5).expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].run_id, None);
    assert_eq!(rows[1].api_name, "HotBits");
}

#[test]
fn incompatible_store_is_a_fatal_startup_error() {
    // Given: a store whose runs table has a different shape
    let temp = tempdir().expect("tempdir");
    let config = config(temp.path());
    std::fs::create_dir_all(config.db_path.parent().expect("parent")).expect("mkdir");
    {
        let connection = Connection::open(&config.db_path).expect("db");
        connection
            .execute_batch("CREATE TABLE runs (id INTEGER, payload TEXT)")
            .expect("foreign schema");
    }

    // When: the audit log is opened
    let error = AuditLog::open(config).err().expect("open must fail");

    // Then: the store is rejected as incompatible
    assert!(matches!(error, AuditLogError::IncompatibleSchema(_)));
    assert!(error.to_string().contains("incompatible audit store"));
}

// =============================================================================
// Records
// =============================================================================

#[test]
fn ids_increase_monotonically_and_success_follows_numbers() {
    // Given: an open audit log
    let temp = tempdir().expect("tempdir");
    let log = AuditLog::open(config(temp.path())).expect("open");

    // When: a failure and a success are recorded
    let first = log.append(&failed("a")).expect("append");
    let second = log.append(&succeeded("b", vec![4, 5])).expect("append");

    // Then: ids increase and success is derived from the numbers
    assert!(second > first);
    let rows = log.recent_records(10).expect("rows");
    assert_eq!(rows[0].id, second);
    assert!(rows[0].success);
    assert_eq!(rows[0].numbers, Some(vec![4, 5]));
    assert!(!rows[1].success);
    assert_eq!(rows[1].numbers, None);
    assert_eq!(rows[1].count, 5);
    assert!(rows[1]
        .error_msg
        .as_deref()
        .is_some_and(|message| message.contains("500")));
}

#[test]
fn failure_history_seeds_quarantine_candidates() {
    // Given: three consecutive failures for one source and a success for another
    let temp = tempdir().expect("tempdir");
    let log = AuditLog::open(config(temp.path())).expect("open");
    for _ in 0..3 {
        log.record(&failed("flaky")).expect("record");
    }
    log.record(&succeeded("steady", vec![1])).expect("record");

    // When: failure streaks within the last hour are read
    let streaks = log
        .failure_streaks(Duration::from_secs(3600))
        .expect("streaks");

    // Then: only the failing source is reported with its streak length
    assert_eq!(streaks.len(), 1);
    assert_eq!(streaks[0].source, "flaky");
    assert_eq!(streaks[0].streak, 3);

    // And: a zero-length window excludes it
    let none = log.failure_streaks(Duration::ZERO).expect("streaks");
    assert!(none.is_empty());
}

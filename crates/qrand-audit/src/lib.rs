//! DuckDB-backed audit log: one `runs` row per source invocation.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::duckdb::{Connection, ToSql};
use qrand_core::{AuditError, AuditRecord, AuditSink};
use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Rows inspected per source when computing failure streaks.
const STREAK_SCAN_LIMIT: usize = 64;

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("incompatible audit store: {0}")]
    IncompatibleSchema(String),

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Debug, Clone)]
pub struct AuditLogConfig {
    pub qrand_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        let qrand_home = resolve_qrand_home();
        let db_path = qrand_home.join("audit.duckdb");
        Self {
            qrand_home,
            db_path,
            max_pool_size: 2,
        }
    }
}

impl AuditLogConfig {
    /// Default configuration pointed at an explicit database file.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

/// One persisted `runs` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRun {
    pub id: i64,
    pub ts: String,
    pub api_name: String,
    pub count: i64,
    pub numbers: Option<Vec<i64>>,
    pub success: bool,
    pub error_msg: Option<String>,
    pub run_id: Option<String>,
}

/// Trailing run of failures recorded for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureStreak {
    pub source: String,
    pub streak: u32,
    pub since_last_failure: Duration,
}

#[derive(Clone)]
pub struct AuditLog {
    manager: DuckDbConnectionManager,
    run_id: Uuid,
    has_run_id: bool,
}

impl AuditLog {
    /// Open or create the store.
    ///
    /// A `runs` table left by an earlier version is accepted as long as the
    /// columns this log writes exist with compatible types.
    pub fn open(config: AuditLogConfig) -> Result<Self, AuditLogError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let has_run_id = {
            let connection = manager.acquire()?;
            initialize(&connection)?
        };

        let log = Self {
            manager,
            run_id: Uuid::new_v4(),
            has_run_id,
        };
        debug!(
            db_path = %log.db_path().display(),
            run_id = %log.run_id,
            "audit log ready"
        );
        Ok(log)
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Identifier shared by every record written through this handle.
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Append one record and return its id.
    pub fn append(&self, record: &AuditRecord) -> Result<i64, AuditLogError> {
        let ts = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let count = i64::from(record.requested_count.get());
        let numbers = record.numbers.as_deref().map(join_numbers);
        let success = record.success();
        let run_id = self.run_id.to_string();

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<i64, AuditLogError> {
            let id: i64 = connection.query_row(
                "SELECT COALESCE(MAX(id), 0) + 1 FROM runs",
                [],
                |row| row.get(0),
            )?;

            if self.has_run_id {
                let params: [&dyn ToSql; 8] = [
                    &id,
                    &ts,
                    &record.source_name,
                    &count,
                    &numbers,
                    &success,
                    &record.error_message,
                    &run_id,
                ];
                connection.execute(
                    "INSERT INTO runs (id, ts, api_name, count, numbers, success, error_msg, run_id) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
            } else {
                let params: [&dyn ToSql; 7] = [
                    &id,
                    &ts,
                    &record.source_name,
                    &count,
                    &numbers,
                    &success,
                    &record.error_message,
                ];
                connection.execute(
                    "INSERT INTO runs (id, ts, api_name, count, numbers, success, error_msg) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
            }
            Ok(id)
        })();

        let id = finalize_transaction(&connection, result)?;
        debug!(id, source = %record.source_name, success, "audit record written");
        Ok(id)
    }

    pub fn record_count(&self) -> Result<u64, AuditLogError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Latest records, newest first.
    pub fn recent_records(&self, limit: usize) -> Result<Vec<StoredRun>, AuditLogError> {
        let run_id_column = if self.has_run_id {
            "run_id"
        } else {
            "CAST(NULL AS VARCHAR)"
        };
        let sql = format!(
            "SELECT id, ts, api_name, count, numbers, success, error_msg, {run_id_column} \
             FROM runs ORDER BY id DESC LIMIT {limit}"
        );

        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(sql.as_str())?;
        let rows = statement
            .query_map([], |row| {
                let numbers: Option<String> = row.get(4)?;
                Ok(StoredRun {
                    id: row.get(0)?,
                    ts: row.get(1)?,
                    api_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    count: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
                    numbers: numbers.as_deref().map(split_numbers),
                    success: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
                    error_msg: row.get(6)?,
                    run_id: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Per source, the number of consecutive failures since its last success,
    /// for sources whose latest failure happened within `window`.
    pub fn failure_streaks(&self, window: Duration) -> Result<Vec<FailureStreak>, AuditLogError> {
        let connection = self.manager.acquire()?;
        let sources = {
            let mut statement = connection.prepare(
                "SELECT DISTINCT api_name FROM runs WHERE api_name IS NOT NULL ORDER BY api_name",
            )?;
            let rows = statement
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let now = OffsetDateTime::now_utc();
        let mut streaks = Vec::new();
        for source in sources {
            let history = recent_outcomes(&connection, &source)?;
            let streak = history.iter().take_while(|(success, _)| !success).count();
            if streak == 0 {
                continue;
            }

            let Some(last_failure) = history
                .first()
                .and_then(|(_, ts)| OffsetDateTime::parse(ts, &Rfc3339).ok())
            else {
                debug!(source = %source, "skipping failure streak with unreadable timestamp");
                continue;
            };

            let since_last_failure = Duration::try_from(now - last_failure).unwrap_or_default();
            if since_last_failure >= window {
                continue;
            }

            streaks.push(FailureStreak {
                source,
                streak: u32::try_from(streak).unwrap_or(u32::MAX),
                since_last_failure,
            });
        }
        Ok(streaks)
    }
}

impl AuditSink for AuditLog {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.append(record)
            .map(|_| ())
            .map_err(|error| AuditError::new(error.to_string()))
    }
}

fn initialize(connection: &Connection) -> Result<bool, AuditLogError> {
    let existing = migrations::inspect_runs_table(connection)?;
    migrations::apply_migrations(connection)?;
    Ok(existing.map_or(true, |schema| schema.has_run_id))
}

fn recent_outcomes(
    connection: &Connection,
    source: &str,
) -> Result<Vec<(bool, String)>, AuditLogError> {
    let sql = format!(
        "SELECT COALESCE(success, FALSE), ts FROM runs WHERE api_name = ? \
         ORDER BY id DESC LIMIT {STREAK_SCAN_LIMIT}"
    );
    let mut statement = connection.prepare(sql.as_str())?;
    let rows = statement
        .query_map([source], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, AuditLogError>,
) -> Result<T, AuditLogError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn join_numbers(numbers: &[i64]) -> String {
    numbers
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn split_numbers(text: &str) -> Vec<i64> {
    text.split(',')
        .filter_map(|value| value.trim().parse().ok())
        .collect()
}

/// `QRAND_HOME`, else `$HOME/.qrand`, else `.qrand`.
pub fn resolve_qrand_home() -> PathBuf {
    if let Some(path) = env::var_os("QRAND_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".qrand");
    }

    PathBuf::from(".qrand")
}
